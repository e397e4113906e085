//! Shared fixtures: an in-memory SCM over a real working directory and a
//! scripted operator.

#![allow(dead_code)]

use resumable_release::archive::pack_tree;
use resumable_release::error::{CliError, PreconditionError, Result, ScmError};
use resumable_release::operator::{GateChoice, Operator};
use resumable_release::scm::{ScmAdapter, tag_name};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use walkdir::WalkDir;

/// File contents of one commit, keyed by path relative to the root
pub type Snapshot = BTreeMap<PathBuf, Vec<u8>>;

#[derive(Debug, Default)]
struct MockState {
    head_branch: String,
    branches: HashMap<String, String>,
    commits: HashMap<String, Snapshot>,
    tags: BTreeMap<String, String>,
    next_rev: u32,
    calls: Vec<String>,
    fail_next_reset: bool,
}

impl MockState {
    fn resolve(&self, revision: &str) -> Option<String> {
        if revision == "HEAD" {
            return self.branches.get(&self.head_branch).cloned();
        }
        if let Some(rev) = self.branches.get(revision) {
            return Some(rev.clone());
        }
        self.commits.contains_key(revision).then(|| revision.to_string())
    }

    fn head_snapshot(&self) -> Snapshot {
        self.resolve("HEAD")
            .and_then(|rev| self.commits.get(&rev).cloned())
            .unwrap_or_default()
    }

    fn new_rev(&mut self) -> String {
        self.next_rev += 1;
        format!("rev{}", self.next_rev)
    }
}

/// Version control over a real directory; history lives in memory
pub struct MockScm {
    root: PathBuf,
    state: Mutex<MockState>,
}

fn read_tree(root: &Path, tracked: Option<&Snapshot>) -> Snapshot {
    match tracked {
        Some(tracked) => tracked
            .keys()
            .filter_map(|rel| std::fs::read(root.join(rel)).ok().map(|c| (rel.clone(), c)))
            .collect(),
        None => WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                let rel = e.path().strip_prefix(root).unwrap().to_path_buf();
                (rel, std::fs::read(e.path()).unwrap())
            })
            .collect(),
    }
}

impl MockScm {
    /// Track every file currently under `root` as the first commit on `master`
    pub fn init(root: &Path) -> Self {
        let mut state = MockState {
            head_branch: "master".to_string(),
            ..Default::default()
        };
        let rev = state.new_rev();
        state.commits.insert(rev.clone(), read_tree(root, None));
        state.branches.insert("master".to_string(), rev);
        Self {
            root: root.to_path_buf(),
            state: Mutex::new(state),
        }
    }

    /// Modify a tracked file and commit it on the current branch
    pub fn commit_on_head(&self, rel: &str, content: &str) -> String {
        std::fs::write(self.root.join(rel), content).unwrap();
        let mut state = self.state.lock().unwrap();
        let mut snapshot = state.head_snapshot();
        snapshot.insert(PathBuf::from(rel), content.as_bytes().to_vec());
        let rev = state.new_rev();
        state.commits.insert(rev.clone(), snapshot);
        let branch = state.head_branch.clone();
        state.branches.insert(branch, rev.clone());
        rev
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn has_branch(&self, branch: &str) -> bool {
        self.state.lock().unwrap().branches.contains_key(branch)
    }

    pub fn tag_target(&self, version: &str) -> Option<String> {
        self.state.lock().unwrap().tags.get(version).cloned()
    }

    pub fn branch_head(&self, branch: &str) -> Option<String> {
        self.state.lock().unwrap().branches.get(branch).cloned()
    }

    pub fn file_at(&self, revision: &str, rel: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        let rev = state.resolve(revision)?;
        state
            .commits
            .get(&rev)?
            .get(Path::new(rel))
            .map(|c| String::from_utf8_lossy(c).into_owned())
    }

    /// Make the next `reset_hard` fail without touching anything
    pub fn fail_next_reset(&self) {
        self.state.lock().unwrap().fail_next_reset = true;
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

impl ScmAdapter for MockScm {
    fn root_dir(&self) -> &Path {
        &self.root
    }

    async fn head_revision(&self) -> Result<String> {
        let state = self.state.lock().unwrap();
        state.resolve("HEAD").ok_or_else(|| {
            ScmError::UnexpectedOutput {
                command: "rev-parse HEAD".to_string(),
                reason: "no commits".to_string(),
            }
            .into()
        })
    }

    async fn current_branch(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().head_branch.clone())
    }

    async fn ensure_no_uncommitted_changes(&self) -> Result<()> {
        let committed = self.state.lock().unwrap().head_snapshot();
        let live = read_tree(&self.root, Some(&committed));
        let changed: Vec<String> = committed
            .iter()
            .filter(|(rel, content)| live.get(*rel) != Some(*content))
            .map(|(rel, _)| format!(" M {}", rel.display()))
            .collect();
        if !changed.is_empty() {
            return Err(PreconditionError::DirtyWorkingTree {
                files: changed.join("\n"),
            }
            .into());
        }
        Ok(())
    }

    async fn ensure_tracked(&self, path: &Path) -> Result<()> {
        let root = std::fs::canonicalize(&self.root)?;
        let rel = std::fs::canonicalize(path)?
            .strip_prefix(&root)
            .map(Path::to_path_buf)
            .unwrap_or_default();
        if !self.state.lock().unwrap().head_snapshot().contains_key(&rel) {
            return Err(PreconditionError::Untracked {
                path: path.to_path_buf(),
            }
            .into());
        }
        Ok(())
    }

    async fn find_outstanding_markers(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn create_commit(&self, message: &str, branch: &str, parent: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        let parent_rev = state.resolve(parent).ok_or_else(|| ScmError::CommandFailed {
            command: format!("commit-tree -p {}", parent),
            stderr: "unknown revision".to_string(),
        })?;
        let tracked = state.commits.get(&parent_rev).cloned().unwrap_or_default();
        let snapshot = read_tree(&self.root, Some(&tracked));
        let rev = state.new_rev();
        state.commits.insert(rev.clone(), snapshot);
        state.branches.insert(branch.to_string(), rev.clone());
        state.calls.push(format!("commit {} on {}: {}", rev, branch, message));
        Ok(rev)
    }

    async fn tag(&self, version: &str, revision: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.tags.contains_key(version) {
            return Err(PreconditionError::TagExists {
                tag: tag_name(version),
            }
            .into());
        }
        state.tags.insert(version.to_string(), revision.to_string());
        state.calls.push(format!("tag {} {}", tag_name(version), revision));
        Ok(())
    }

    async fn delete_branch(&self, branch: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.branches.remove(branch);
        state.calls.push(format!("delete-branch {}", branch));
        Ok(())
    }

    async fn reset_hard(&self, revision: &str) -> Result<()> {
        let snapshot = {
            let mut state = self.state.lock().unwrap();
            if std::mem::take(&mut state.fail_next_reset) {
                return Err(ScmError::CommandFailed {
                    command: format!("reset --hard {}", revision),
                    stderr: "interrupted".to_string(),
                }
                .into());
            }
            let rev = state.resolve(revision).ok_or_else(|| ScmError::CommandFailed {
                command: format!("reset --hard {}", revision),
                stderr: "unknown revision".to_string(),
            })?;
            let branch = state.head_branch.clone();
            state.branches.insert(branch, rev.clone());
            state.calls.push(format!("reset {}", revision));
            state.commits.get(&rev).cloned().unwrap_or_default()
        };
        for (rel, content) in snapshot {
            std::fs::write(self.root.join(rel), content)?;
        }
        Ok(())
    }

    async fn export_tree(&self, prefix: &str, archive: &Path, revision: &str) -> Result<()> {
        let snapshot = {
            let state = self.state.lock().unwrap();
            let rev = state.resolve(revision).unwrap_or_else(|| revision.to_string());
            state.commits.get(&rev).cloned().unwrap_or_default()
        };
        let staging = tempfile::tempdir()?;
        for (rel, content) in &snapshot {
            let dest = staging.path().join(prefix).join(rel);
            std::fs::create_dir_all(dest.parent().unwrap())?;
            std::fs::write(dest, content)?;
        }
        self.record(format!("export {} {}", prefix, revision));
        pack_tree(staging.path(), prefix, archive).await
    }

    async fn tagged_versions(&self) -> Result<Vec<String>> {
        Ok(self.state.lock().unwrap().tags.keys().cloned().collect())
    }

    async fn diff_log(&self, from: Option<&str>, to: &str) -> Result<String> {
        Ok(format!("log {}..{}\n", from.unwrap_or(""), to))
    }

    async fn has_submodules(&self) -> Result<bool> {
        Ok(false)
    }

    async fn export_submodules(&self, _dest: &Path) -> Result<()> {
        Ok(())
    }

    async fn push_head_and_tag(&self, version: &str) -> Result<()> {
        self.record(format!("push {}", tag_name(version)));
        Ok(())
    }
}

type GateHook = Box<dyn Fn() + Send + Sync>;

/// Operator with pre-recorded answers; an exhausted gate script cancels
#[derive(Default)]
pub struct ScriptedOperator {
    version: Option<String>,
    gates: Mutex<VecDeque<GateChoice>>,
    confirms: Mutex<VecDeque<bool>>,
    questions: Mutex<Vec<String>>,
    on_gate: Option<GateHook>,
}

impl ScriptedOperator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    pub fn with_gates(self, gates: &[GateChoice]) -> Self {
        self.gates.lock().unwrap().extend(gates.iter().copied());
        self
    }

    pub fn with_confirms(self, answers: &[bool]) -> Self {
        self.confirms.lock().unwrap().extend(answers.iter().copied());
        self
    }

    /// Run `hook` whenever the gate question is asked
    pub fn on_gate(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_gate = Some(Box::new(hook));
        self
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().unwrap().clone()
    }
}

impl Operator for ScriptedOperator {
    fn choose_version(&self, current: &str, suggested: Option<&str>) -> Result<String> {
        self.questions
            .lock()
            .unwrap()
            .push(format!("version (current {})", current));
        match (&self.version, suggested) {
            (Some(v), _) => Ok(v.clone()),
            (None, Some(s)) => Ok(s.to_string()),
            (None, None) => Err(CliError::Cancelled {
                reason: "no version scripted".to_string(),
            }
            .into()),
        }
    }

    fn choose_gate(&self, version: &str, offer_diff: bool) -> Result<GateChoice> {
        self.questions
            .lock()
            .unwrap()
            .push(format!("gate {} (diff offered: {})", version, offer_diff));
        if let Some(hook) = &self.on_gate {
            hook();
        }
        self.gates.lock().unwrap().pop_front().ok_or_else(|| {
            CliError::Cancelled {
                reason: "interrupted at gate".to_string(),
            }
            .into()
        })
    }

    fn confirm(&self, question: &str) -> Result<bool> {
        self.questions.lock().unwrap().push(question.to_string());
        Ok(self.confirms.lock().unwrap().pop_front().unwrap_or(true))
    }
}

/// A working copy with a release manifest and one versioned script
pub struct Project {
    pub dir: tempfile::TempDir,
}

impl Project {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work");
        std::fs::create_dir_all(&work).unwrap();
        std::fs::create_dir_all(dir.path().join("releases")).unwrap();
        std::fs::create_dir_all(dir.path().join("public")).unwrap();
        std::fs::write(
            work.join("release.toml"),
            r#"name = "Demo"
version = "1.0-pre"
released = ""
main = "demo.sh"

[[release.update-version]]
path = "demo.sh"
pattern = '^VERSION="(.*)"$'
"#,
        )
        .unwrap();
        std::fs::write(work.join("demo.sh"), "#!/bin/sh\nVERSION=\"1.0-pre\"\necho $VERSION\n").unwrap();
        Self { dir }
    }

    pub fn work(&self) -> PathBuf {
        self.dir.path().join("work")
    }

    pub fn releases(&self) -> PathBuf {
        self.dir.path().join("releases")
    }

    pub fn public(&self) -> PathBuf {
        self.dir.path().join("public")
    }

    pub fn manifest(&self) -> PathBuf {
        self.work().join("release.toml")
    }

    pub fn feed(&self) -> PathBuf {
        self.releases().join("demo-feed.json")
    }

    pub fn state_file(&self) -> PathBuf {
        self.releases().join("release-status.json")
    }
}
