//! Canned multi-step plans for well-known workflow requests.
//!
//! A workflow command that names a recognised goal ("set up a web scraping
//! project", "dev environment with git and nodejs", ...) expands into a fixed
//! step skeleton instead of a conjunction split.  Optional steps of a
//! template appear only when the command mentions what they need.
//!
//! The first trigger that matches picks the template.  A template with
//! nothing to emit leaves the command to the generic split.
//!
//! | Trigger | Plan |
//! |---------|------|
//! | `web scraping`, `scrape` | project, packages, news scraper, editor |
//! | `development environment`, `dev environment` | git, node, vscode, clone, dev server |
//! | `data analysis`, `pandas` with `matplotlib`/`seaborn` | project, packages, sample data |
//! | `backup` with `download`/`install` | folder backup, python installer, screenshot |
//! | `project` with a language | language project skeleton |

use omni_kernel::PatternTable;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::extractor::compile;
use crate::step::StepSpec;

type Template = fn(&WorkflowTemplates, &str) -> Vec<StepSpec>;

const LANGUAGE: &str = r"(?:python|javascript|typescript|java|rust|golang|node\.?js)";

fn template_rows() -> Vec<(String, Template)> {
    vec![
        (r"\b(?:web\s+scraping|scrape|scraper)\b".into(), web_scraping as Template),
        (r"\b(?:development|dev)\s+environment\b".into(), dev_environment as Template),
        (r"\bdata\s+analysis\b".into(), data_analysis as Template),
        (r"\bpandas\b.*\b(?:matplotlib|seaborn)\b".into(), data_analysis as Template),
        (r"\b(?:matplotlib|seaborn)\b.*\bpandas\b".into(), data_analysis as Template),
        (r"\bbackup\b.*\b(?:download|install)\b".into(), backup_and_install as Template),
        (r"\b(?:download|install)\b.*\bbackup\b".into(), backup_and_install as Template),
        (format!(r"\b{LANGUAGE}\b.*\bproject\b"), project_setup as Template),
        (format!(r"\bproject\b.*\b{LANGUAGE}\b"), project_setup as Template),
    ]
}

/// The template table plus the extractors the templates share.
#[derive(Debug, Clone)]
pub struct WorkflowTemplates {
    rows: PatternTable<Template>,
    project_name: Regex,
    github_repo: Regex,
}

impl WorkflowTemplates {
    pub fn new() -> Result<Self> {
        let mut rows = PatternTable::new();
        for (pattern, template) in template_rows() {
            rows.push(pattern, template)?;
        }
        Ok(Self {
            rows,
            project_name: compile(
                r#"\b(?:project|folder|analysis)\s+(?:called|named)\s+["']?([\w.-]+)"#,
            )?,
            github_repo: compile(r"github\.com/([^/\s]+/[^/\s]+)")?,
        })
    }

    /// Expand `text` with the first template that applies.  `None` when no
    /// trigger matches or the matching template has nothing to emit.
    pub fn expand(&self, text: &str) -> Option<Vec<StepSpec>> {
        let (template, _) = self.rows.first_match(text)?;
        let steps = template(self, text);
        if steps.is_empty() {
            return None;
        }
        debug!(steps = steps.len(), "workflow template expanded");
        Some(steps)
    }

    fn project_name(&self, text: &str, default: &str) -> String {
        self.project_name
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map_or_else(|| default.to_string(), |m| m.as_str().trim_end_matches('.').to_string())
    }
}

/// Ordered plan under construction.  Priorities follow push order.
#[derive(Default)]
struct Plan {
    steps: Vec<StepSpec>,
}

impl Plan {
    fn push(&mut self, step: StepSpec) -> &mut Self {
        let priority = self.steps.len() as u32 + 1;
        self.steps.push(step.with_priority(priority));
        self
    }

    fn then_after_all(&mut self, step: StepSpec) -> &mut Self {
        let step = (0..self.steps.len()).fold(step, StepSpec::depends_on);
        self.push(step)
    }

    fn then_after_first(&mut self, step: StepSpec) -> &mut Self {
        let step = if self.steps.is_empty() { step } else { step.depends_on(0) };
        self.push(step)
    }
}

/// Whole-token membership.  Tokens keep `.`, `-` and `_` so `node.js` and
/// `scikit-learn` survive.
fn mentions(text: &str, words: &[&str]) -> bool {
    text.split(|c: char| !(c.is_alphanumeric() || matches!(c, '.' | '-' | '_')))
        .map(|token| token.trim_end_matches('.'))
        .any(|token| words.contains(&token))
}

fn mentions_prefix(text: &str, prefix: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .any(|token| token.starts_with(prefix))
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

fn web_scraping(t: &WorkflowTemplates, text: &str) -> Vec<StepSpec> {
    let name = t.project_name(text, "WebScrapingProject");
    let mut plan = Plan::default();
    plan.push(
        StepSpec::new("create_web_scraping_project", "project_generator")
            .with_param("name", name.as_str())
            .with_param("type", "web_scraping"),
    );
    if mentions(text, &["requests"]) || mentions_prefix(text, "beautifulsoup") {
        plan.then_after_all(
            StepSpec::new("install_packages", "package_manager")
                .with_param("packages", vec!["requests", "beautifulsoup4", "lxml"]),
        );
    }
    if mentions(text, &["news", "headlines"]) {
        plan.then_after_all(
            StepSpec::new("create_news_scraper", "code_generator")
                .with_param("filename", "news_scraper.py")
                .with_param("target", "headlines"),
        );
    }
    if mentions(text, &["vscode"]) {
        plan.then_after_all(StepSpec::new("open_in_vscode", "editor").with_param("path", name));
    }
    plan.steps
}

fn dev_environment(t: &WorkflowTemplates, text: &str) -> Vec<StepSpec> {
    let mut plan = Plan::default();
    let git = mentions(text, &["git"]);
    if git {
        plan.push(StepSpec::new("install_git", "installer").with_param("silent", true));
    }
    if mentions(text, &["nodejs", "node.js", "node", "npm"]) {
        plan.push(StepSpec::new("install_nodejs", "installer").with_param("version", "latest"));
    }
    if mentions(text, &["vscode"]) {
        plan.push(
            StepSpec::new("install_vscode", "installer")
                .with_param("extensions", vec!["python", "javascript"]),
        );
    }
    if mentions(text, &["clone"])
        && mentions_prefix(text, "repo")
        && let Some(repo) = t.github_repo.captures(text).and_then(|caps| caps.get(1))
    {
        let step = StepSpec::new("clone_repository", "git")
            .with_param("url", format!("https://github.com/{}", repo.as_str()));
        if git {
            plan.then_after_first(step);
        } else {
            plan.push(step);
        }
    }
    if mentions(text, &["start"]) && mentions(text, &["server", "dev"]) {
        plan.then_after_all(
            StepSpec::new("start_dev_server", "development").with_param("command", "npm start"),
        );
    }
    plan.steps
}

fn data_analysis(t: &WorkflowTemplates, text: &str) -> Vec<StepSpec> {
    let name = t.project_name(text, "DataAnalysisProject");
    let mut packages = vec!["pandas", "numpy", "matplotlib", "seaborn", "jupyter"];
    for (word, package) in [
        ("scipy", "scipy"),
        ("plotly", "plotly"),
        ("sklearn", "scikit-learn"),
        ("scikit-learn", "scikit-learn"),
    ] {
        if mentions(text, &[word]) && !packages.contains(&package) {
            packages.push(package);
        }
    }

    let mut plan = Plan::default();
    plan.push(
        StepSpec::new("create_data_analysis_project", "project_generator")
            .with_param("name", name.as_str())
            .with_param("type", "data_analysis"),
    )
    .then_after_first(
        StepSpec::new("install_packages", "package_manager").with_param("packages", packages),
    );
    if mentions(text, &["sample", "generate"]) {
        plan.then_after_first(
            StepSpec::new("generate_sample_data", "data_generator").with_param("project_name", name),
        );
    }
    plan.steps
}

fn backup_and_install(_: &WorkflowTemplates, text: &str) -> Vec<StepSpec> {
    let mut plan = Plan::default();
    if mentions(text, &["documents"]) {
        plan.push(
            StepSpec::new("backup_folder", "backup")
                .with_param("source", "Documents")
                .with_param("destination", "Backup_Documents"),
        );
    }
    if mentions(text, &["download"]) && mentions(text, &["python"]) {
        plan.push(
            StepSpec::new("download_python_installer", "downloader").with_param("version", "latest"),
        );
    }
    if mentions(text, &["screenshot"]) {
        plan.then_after_all(
            StepSpec::new("take_screenshot", "gui")
                .with_param("filename", "workflow_complete.png"),
        );
        if let Some(last) = plan.steps.last_mut() {
            last.priority = 99;
        }
    }
    plan.steps
}

fn project_setup(t: &WorkflowTemplates, text: &str) -> Vec<StepSpec> {
    let kind = if mentions(text, &["python"]) {
        "python"
    } else if mentions(text, &["javascript", "node", "nodejs", "node.js"]) {
        "javascript"
    } else {
        "generic"
    };
    let mut step = StepSpec::new(format!("create_{kind}_project"), "project_generator")
        .with_param("name", t.project_name(text, "MyProject"))
        .with_priority(1);
    if kind == "generic" {
        let language = ["typescript", "java", "rust", "golang"]
            .into_iter()
            .find(|lang| mentions(text, &[*lang]))
            .map_or(Value::Null, Value::from);
        step = step.with_param("language", language);
    }
    vec![step]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn templates() -> WorkflowTemplates {
        WorkflowTemplates::new().expect("template table compiles")
    }

    fn actions(steps: &[StepSpec]) -> Vec<&str> {
        steps.iter().map(|s| s.action.as_str()).collect()
    }

    fn deps(step: &StepSpec) -> Vec<usize> {
        step.dependencies.iter().copied().collect()
    }

    #[test]
    fn data_analysis_project_with_name() {
        let steps = templates()
            .expand("set up a data analysis project called sales")
            .unwrap();
        assert_eq!(actions(&steps), vec!["create_data_analysis_project", "install_packages"]);
        assert_eq!(steps[0].params["name"], "sales");
        assert_eq!(steps[0].params["type"], "data_analysis");
        assert_eq!(deps(&steps[1]), vec![0]);
        assert_eq!(
            steps[1].params["packages"],
            serde_json::json!(["pandas", "numpy", "matplotlib", "seaborn", "jupyter"])
        );
    }

    #[test]
    fn data_analysis_extras_and_sample_data() {
        let steps = templates()
            .expand("use pandas and seaborn with sklearn and generate sample data")
            .unwrap();
        assert_eq!(steps[0].params["name"], "DataAnalysisProject");
        let packages = steps[1].params["packages"].as_array().unwrap();
        assert!(packages.contains(&Value::from("scikit-learn")));
        assert_eq!(steps[2].action, "generate_sample_data");
        assert_eq!(deps(&steps[2]), vec![0]);
    }

    #[test]
    fn web_scraping_full_plan() {
        let steps = templates()
            .expand("build a web scraping project called news with requests and beautifulsoup for headlines and open in vscode")
            .unwrap();
        assert_eq!(
            actions(&steps),
            vec![
                "create_web_scraping_project",
                "install_packages",
                "create_news_scraper",
                "open_in_vscode"
            ]
        );
        assert_eq!(deps(&steps[2]), vec![0, 1]);
        assert_eq!(deps(&steps[3]), vec![0, 1, 2]);
        assert_eq!(steps[3].params["path"], "news");
        assert_eq!(
            steps.iter().map(|s| s.priority).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
    }

    #[test]
    fn web_scraping_minimal_plan_is_one_step() {
        let steps = templates().expand("scrape some prices then save them").unwrap();
        assert_eq!(actions(&steps), vec!["create_web_scraping_project"]);
        assert_eq!(steps[0].params["name"], "WebScrapingProject");
    }

    #[test]
    fn dev_environment_clone_waits_for_git() {
        let steps = templates()
            .expand("set up a dev environment with git and nodejs then clone repo github.com/acme/site and start the dev server")
            .unwrap();
        assert_eq!(
            actions(&steps),
            vec!["install_git", "install_nodejs", "clone_repository", "start_dev_server"]
        );
        assert_eq!(steps[2].params["url"], "https://github.com/acme/site");
        assert_eq!(deps(&steps[2]), vec![0]);
        assert_eq!(deps(&steps[3]), vec![0, 1, 2]);
    }

    #[test]
    fn dev_environment_with_nothing_named_does_not_apply() {
        assert!(templates().expand("prepare a development environment").is_none());
    }

    #[test]
    fn backup_then_download_with_screenshot_last() {
        let steps = templates()
            .expand("backup documents and download python and take a screenshot")
            .unwrap();
        assert_eq!(
            actions(&steps),
            vec!["backup_folder", "download_python_installer", "take_screenshot"]
        );
        assert_eq!(steps[2].priority, 99);
        assert_eq!(deps(&steps[2]), vec![0, 1]);
        assert!(steps[1].dependencies.is_empty());
    }

    #[test]
    fn project_setup_picks_language() {
        let t = templates();
        let steps = t.expand("start a python project named api and add tests").unwrap();
        assert_eq!(steps[0].action, "create_python_project");
        assert_eq!(steps[0].params["name"], "api");

        let steps = t.expand("a new rust project then build it").unwrap();
        assert_eq!(steps[0].action, "create_generic_project");
        assert_eq!(steps[0].params["name"], "MyProject");
        assert_eq!(steps[0].params["language"], "rust");
    }

    #[test]
    fn git_is_not_read_from_github() {
        assert!(!mentions("clone github.com/acme/site", &["git"]));
        assert!(mentions("install node.js.", &["node.js"]));
    }

    #[test]
    fn unrelated_text_has_no_template() {
        assert!(templates().expand("copy a to b then move c to d").is_none());
    }
}
