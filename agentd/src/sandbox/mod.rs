//! Container-backed action executor.
//!
//! Each task gets its own [`Sandbox`] bound to its workspace directory.
//! Python/shell actions run directly inside the container; browser and
//! search actions are synthesized as fresh, stateless Python programs (each
//! call starts its own headless-browser session — there is no persistence
//! between calls).

mod docker;

use tracing::{debug, info};

use crate::config::SandboxConfig;
use crate::domain::{Action, BrowserOp};
use crate::error::SandboxError;

pub use docker::DockerBackend;

pub struct Sandbox {
    backend: DockerBackend,
    container_name: String,
    timeout: std::time::Duration,
}

impl Sandbox {
    pub fn new(config: SandboxConfig, task_id: &str) -> Result<Self, SandboxError> {
        let timeout = config.exec_timeout();
        let container_name = format!("agentd-sandbox-{task_id}");
        Ok(Self { backend: DockerBackend::connect(config)?, container_name, timeout })
    }

    pub async fn start(&mut self, workspace_dir: &str) -> Result<(), SandboxError> {
        info!(container = %self.container_name, "Sandbox::start");
        self.backend.start(&self.container_name, workspace_dir).await
    }

    pub async fn stop(&mut self) -> Result<(), SandboxError> {
        info!(container = %self.container_name, "Sandbox::stop");
        self.backend.stop().await
    }

    /// Dispatch a single action and produce its text observation. Only
    /// actions that reach the sandbox are handled here; `save_file` /
    /// `read_file` are delegated by the caller to the workspace store.
    pub async fn dispatch(&self, action: &Action) -> Result<String, SandboxError> {
        match action {
            Action::ExecutePython { code } => self.run_python(code).await,
            Action::ShellCommand { command } => self.run_shell(command).await,
            Action::BrowserNavigate { url, op, selector, value } => self.browser_navigate(url, op, selector.as_deref(), value.as_deref()).await,
            Action::WebSearch { query, num_results } => self.web_search(query, *num_results).await,
            other => Err(SandboxError::Unavailable(format!("action {other:?} is not sandbox-dispatched"))),
        }
    }

    async fn run_python(&self, code: &str) -> Result<String, SandboxError> {
        debug!(code_len = code.len(), "Sandbox::run_python");
        let filename = format!("_agent_code_{}.py", chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default());
        let path = format!("/workspace/{filename}");

        let write_cmd = format!("cat > {path} << 'AGENTD_EOF'\n{code}\nAGENTD_EOF");
        let (exit_code, _) = self.backend.exec(vec!["bash", "-c", &write_cmd], self.timeout).await?;
        if exit_code != 0 {
            return Err(SandboxError::ExecFailed { status: exit_code, message: "failed to stage python file".to_string() });
        }

        let (_, output) = self.backend.exec(vec!["python3", &path], self.timeout).await?;
        Ok(output)
    }

    async fn run_shell(&self, command: &str) -> Result<String, SandboxError> {
        debug!(%command, "Sandbox::run_shell");
        let (_, output) = self.backend.exec(vec!["bash", "-c", command], self.timeout).await?;
        Ok(output)
    }

    async fn browser_navigate(&self, url: &str, op: &BrowserOp, selector: Option<&str>, value: Option<&str>) -> Result<String, SandboxError> {
        debug!(%url, ?op, "Sandbox::browser_navigate");
        let code = synthesize_browser_script(url, op, selector, value);
        self.run_python(&code).await
    }

    async fn web_search(&self, query: &str, num_results: u32) -> Result<String, SandboxError> {
        debug!(%query, num_results, "Sandbox::web_search");
        let code = synthesize_search_script(query, num_results);
        self.run_python(&code).await
    }
}

fn synthesize_browser_script(url: &str, op: &BrowserOp, selector: Option<&str>, value: Option<&str>) -> String {
    let selector_literal = selector.map(|s| format!("'{s}'")).unwrap_or_else(|| "'body'".to_string());
    let action_code = match op {
        BrowserOp::Navigate => "content = page.content()\nprint(content)".to_string(),
        BrowserOp::GetText => format!("el = page.query_selector({selector_literal})\nprint(el.inner_text() if el else \"Element not found\")"),
        BrowserOp::Screenshot => "page.screenshot(path='/workspace/screenshot.png', full_page=True)\nprint('Screenshot saved to /workspace/screenshot.png')".to_string(),
        BrowserOp::Click => format!("page.click('{}')\npage.wait_for_load_state('networkidle')\nprint('Clicked on {}')", selector.unwrap_or_default(), selector.unwrap_or_default()),
        BrowserOp::FillForm => format!("page.fill('{}', '{}')\nprint('Filled field with value')", selector.unwrap_or_default(), value.unwrap_or_default()),
        BrowserOp::ExtractLinks => "links = page.query_selector_all('a[href]')\nurls = [l.get_attribute('href') for l in links]\nprint('\\n'.join([u for u in urls if u][:50]))".to_string(),
    };

    format!(
        "from playwright.sync_api import sync_playwright\n\
with sync_playwright() as p:\n\
    browser = p.chromium.launch(headless=True)\n\
    page = browser.new_page()\n\
    page.goto('{url}', wait_until='networkidle')\n\
    {action}\n\
    browser.close()\n",
        url = url,
        action = action_code.replace('\n', "\n    "),
    )
}

fn synthesize_search_script(query: &str, num_results: u32) -> String {
    format!(
        "import requests, json\n\
from bs4 import BeautifulSoup\n\
query = {query:?}\n\
resp = requests.get('https://html.duckduckgo.com/html/', params={{'q': query}}, headers={{'User-Agent': 'Mozilla/5.0'}})\n\
soup = BeautifulSoup(resp.text, 'html.parser')\n\
results = []\n\
for block in soup.find_all('div', class_='result')[:{num_results}]:\n\
    title = block.find('a', class_='result__a')\n\
    snippet = block.find('a', class_='result__snippet')\n\
    if title:\n\
        results.append({{'title': title.get_text(strip=True), 'url': title.get('href', ''), 'snippet': snippet.get_text(strip=True) if snippet else ''}})\n\
print(json.dumps(results, indent=2))\n",
        query = query,
        num_results = num_results,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesize_browser_script_navigate() {
        let script = synthesize_browser_script("http://example.com", &BrowserOp::Navigate, None, None);
        assert!(script.contains("page.goto('http://example.com'"));
        assert!(script.contains("page.content()"));
    }

    #[test]
    fn test_synthesize_browser_script_get_text_defaults_to_body() {
        let script = synthesize_browser_script("http://example.com", &BrowserOp::GetText, None, None);
        assert!(script.contains("query_selector('body')"));
    }

    #[test]
    fn test_synthesize_search_script_embeds_query() {
        let script = synthesize_search_script("rust async", 5);
        assert!(script.contains("rust async"));
        assert!(script.contains("[:5]"));
    }
}
