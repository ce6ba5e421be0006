//! Mirrors an input class tree into an output tree, stripping finals on the way.

use anyhow::{Context, Result, bail};
use ignore::WalkBuilder;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::classfile;
use crate::config::FilterConfig;
use crate::error::ClassFormatError;
use crate::mutate::{StripSummary, strip_finals};
use crate::rules::{Decision, FilterRules};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    PlainFile,
    ClassFile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Path relative to the input root.
    pub relative: PathBuf,
    pub kind: EntryKind,
}

/// Result of running one class file through parse, filter, mutate, serialize.
#[derive(Debug, Clone)]
pub struct ClassRewrite {
    pub class_name: String,
    pub decision: Decision,
    /// Present only when the class was in scope.
    pub summary: Option<StripSummary>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
enum FileOutcome {
    Copied,
    Transformed {
        path: PathBuf,
        class_name: String,
        summary: StripSummary,
    },
    Untouched,
    Fallback {
        path: PathBuf,
        error: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct TransformedClass {
    pub path: String,
    pub class_name: String,
    pub class_stripped: bool,
    pub methods: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FallbackRecord {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub input: String,
    pub output: String,
    pub directories: usize,
    pub copied_files: usize,
    pub transformed_classes: usize,
    pub untouched_classes: usize,
    pub fallback_classes: usize,
    pub stripped_methods: usize,
    pub duration_ms: u64,
    pub transformed: Vec<TransformedClass>,
    pub fallbacks: Vec<FallbackRecord>,
}

#[derive(Debug, Clone)]
pub struct Transformer {
    rules: FilterRules,
    parallel: bool,
}

impl Transformer {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            rules: FilterRules::new(config),
            parallel: false,
        }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn run(&self, input: &Path, output: &Path) -> Result<RunReport> {
        let start = Instant::now();

        let meta = fs::metadata(input)
            .with_context(|| format!("Failed to read input root: {}", input.display()))?;
        if !meta.is_dir() {
            bail!("Input root is not a directory: {}", input.display());
        }
        check_roots(input, output)?;
        prepare_output(output)?;

        info!("Input: {}", input.display());
        info!("Output: {}", output.display());

        let entries = discover(input)?;

        let mut report = RunReport {
            input: input.to_string_lossy().to_string(),
            output: output.to_string_lossy().to_string(),
            ..RunReport::default()
        };

        for entry in entries.iter().filter(|e| e.kind == EntryKind::Directory) {
            let target = output.join(&entry.relative);
            debug!("Copy directory to: {}", target.display());
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create directory: {}", target.display()))?;
            report.directories += 1;
        }

        let files: Vec<&Entry> = entries
            .iter()
            .filter(|e| e.kind != EntryKind::Directory)
            .collect();

        let outcomes: Vec<FileOutcome> = if self.parallel {
            files
                .par_iter()
                .map(|entry| self.process_file(input, output, entry))
                .collect::<Result<_>>()?
        } else {
            files
                .iter()
                .map(|entry| self.process_file(input, output, entry))
                .collect::<Result<_>>()?
        };

        for outcome in outcomes {
            match outcome {
                FileOutcome::Copied => report.copied_files += 1,
                FileOutcome::Untouched => report.untouched_classes += 1,
                FileOutcome::Transformed {
                    path,
                    class_name,
                    summary,
                } => {
                    report.transformed_classes += 1;
                    report.stripped_methods += summary.methods.len();
                    report.transformed.push(TransformedClass {
                        path: path.to_string_lossy().to_string(),
                        class_name,
                        class_stripped: summary.class_stripped,
                        methods: summary.methods,
                    });
                }
                FileOutcome::Fallback { path, error } => {
                    report.fallback_classes += 1;
                    report.fallbacks.push(FallbackRecord {
                        path: path.to_string_lossy().to_string(),
                        error,
                    });
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        Ok(report)
    }

    fn process_file(&self, input: &Path, output: &Path, entry: &Entry) -> Result<FileOutcome> {
        let source = input.join(&entry.relative);
        let target = output.join(&entry.relative);
        let bytes = fs::read(&source)
            .with_context(|| format!("Failed to read file: {}", source.display()))?;

        if entry.kind == EntryKind::PlainFile {
            debug!("Copy file to: {}", target.display());
            write_output(&target, &bytes)?;
            return Ok(FileOutcome::Copied);
        }

        match rewrite_class(&self.rules, &bytes) {
            Ok(rewrite) => {
                if let Some(err) = write_class(&target, &rewrite.bytes, &bytes, write_output)? {
                    return Ok(FileOutcome::Fallback {
                        path: entry.relative.clone(),
                        error: format!("{err:#}"),
                    });
                }
                match rewrite.summary {
                    Some(summary) => {
                        info!("Transformed class: {}", rewrite.class_name);
                        Ok(FileOutcome::Transformed {
                            path: entry.relative.clone(),
                            class_name: rewrite.class_name,
                            summary,
                        })
                    }
                    None => {
                        info!("Skipped transforming class: {}", rewrite.class_name);
                        Ok(FileOutcome::Untouched)
                    }
                }
            }
            Err(err) => {
                warn!(
                    "Could not process {} ({err}), copying it unchanged",
                    source.display()
                );
                write_output(&target, &bytes)?;
                Ok(FileOutcome::Fallback {
                    path: entry.relative.clone(),
                    error: err.to_string(),
                })
            }
        }
    }
}

/// Convenience wrapper for a sequential run.
pub fn run(input: &Path, output: &Path, config: &FilterConfig) -> Result<RunReport> {
    Transformer::new(config).run(input, output)
}

/// Parses `bytes`, strips finals if the rules say so, and re-encodes.
///
/// Out-of-scope classes still go through the full decode/encode cycle.
pub fn rewrite_class(rules: &FilterRules, bytes: &[u8]) -> Result<ClassRewrite, ClassFormatError> {
    let mut class = classfile::parse(bytes)?;
    let decision = rules.evaluate(class.name(), class.package_name());
    debug!("{}: {:?}", class.name(), decision);

    let summary = decision.is_included().then(|| strip_finals(&mut class));
    let bytes = classfile::to_bytes(&class)?;

    Ok(ClassRewrite {
        class_name: class.name().to_string(),
        decision,
        summary,
        bytes,
    })
}

/// Every entry under `root` (root excluded), sorted by name at each level.
pub fn discover(root: &Path) -> Result<Vec<Entry>> {
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(true)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut entries = Vec::new();
    for item in walker {
        let item = item.with_context(|| format!("Failed to walk input root: {}", root.display()))?;
        if item.depth() == 0 {
            continue;
        }

        let path = item.path();
        let relative = path
            .strip_prefix(root)
            .with_context(|| format!("Entry outside input root: {}", path.display()))?
            .to_path_buf();

        let kind = if item.file_type().is_some_and(|t| t.is_dir()) {
            EntryKind::Directory
        } else if path.extension().is_some_and(|e| e == "class") {
            EntryKind::ClassFile
        } else {
            EntryKind::PlainFile
        };

        entries.push(Entry { relative, kind });
    }

    Ok(entries)
}

fn write_output(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, data).with_context(|| format!("Failed to write file: {}", path.display()))
}

/// Writes a rewritten class, or the original bytes if that write fails.
///
/// Returns the error of the first write when the original was written instead.
/// Only a failure of both writes is an error.
fn write_class<W>(
    target: &Path,
    rewritten: &[u8],
    original: &[u8],
    mut write: W,
) -> Result<Option<anyhow::Error>>
where
    W: FnMut(&Path, &[u8]) -> Result<()>,
{
    let Err(err) = write(target, rewritten) else {
        return Ok(None);
    };
    warn!("{err:#}, copying {} unchanged", target.display());
    write(target, original)
        .with_context(|| format!("Failed to write original bytes after: {err:#}"))?;
    Ok(Some(err))
}

/// Refuses layouts where clearing or walking the output would touch input.
fn check_roots(input: &Path, output: &Path) -> Result<()> {
    let input_abs = input
        .canonicalize()
        .with_context(|| format!("Failed to resolve input root: {}", input.display()))?;
    let output_abs = resolve_output_path(output)?;

    if input_abs.starts_with(&output_abs) {
        bail!(
            "Output root {} contains input root {}; refusing to clear it",
            output.display(),
            input.display()
        );
    }
    if output_abs.starts_with(&input_abs) {
        bail!(
            "Output root {} lies inside input root {}",
            output.display(),
            input.display()
        );
    }
    Ok(())
}

fn resolve_output_path(output: &Path) -> Result<PathBuf> {
    if output.exists() {
        return output
            .canonicalize()
            .with_context(|| format!("Failed to resolve output root: {}", output.display()));
    }

    let abs = std::path::absolute(output)
        .with_context(|| format!("Failed to resolve output root: {}", output.display()))?;
    match (abs.parent(), abs.file_name()) {
        (Some(parent), Some(name)) if parent.exists() => Ok(parent
            .canonicalize()
            .with_context(|| format!("Failed to resolve directory: {}", parent.display()))?
            .join(name)),
        _ => Ok(abs),
    }
}

/// Deletes whatever sits at `output` and recreates it as an empty directory.
fn prepare_output(output: &Path) -> Result<()> {
    match fs::symlink_metadata(output) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(output)
            .with_context(|| format!("Failed to clear output root: {}", output.display()))?,
        Ok(_) => fs::remove_file(output)
            .with_context(|| format!("Failed to remove output file: {}", output.display()))?,
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            return Err(e)
                .with_context(|| format!("Failed to inspect output root: {}", output.display()));
        }
    }
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output root: {}", output.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const WIDGET: &[u8] = include_bytes!("../tests/fixtures/classes/com/example/Widget.class");

    fn write(root: &Path, rel: &str, data: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, data).unwrap();
    }

    #[test]
    fn discover_classifies_and_sorts() -> Result<()> {
        let dir = TempDir::new()?;
        write(dir.path(), "b/Two.class", WIDGET);
        write(dir.path(), "a/notes.txt", b"x");
        write(dir.path(), "a/One.class", WIDGET);
        fs::create_dir_all(dir.path().join("c/empty"))?;

        let entries = discover(dir.path())?;
        let listed: Vec<(String, EntryKind)> = entries
            .iter()
            .map(|e| (e.relative.to_string_lossy().replace('\\', "/"), e.kind))
            .collect();
        assert_eq!(
            listed,
            vec![
                ("a".to_string(), EntryKind::Directory),
                ("a/One.class".to_string(), EntryKind::ClassFile),
                ("a/notes.txt".to_string(), EntryKind::PlainFile),
                ("b".to_string(), EntryKind::Directory),
                ("b/Two.class".to_string(), EntryKind::ClassFile),
                ("c".to_string(), EntryKind::Directory),
                ("c/empty".to_string(), EntryKind::Directory),
            ]
        );
        Ok(())
    }

    #[test]
    fn discover_does_not_skip_hidden_or_ignored_files() -> Result<()> {
        let dir = TempDir::new()?;
        write(dir.path(), ".gitignore", b"*.bin\n");
        write(dir.path(), "data.bin", b"\x00\x01");
        write(dir.path(), ".hidden/Thing.class", WIDGET);

        let entries = discover(dir.path())?;
        assert_eq!(entries.len(), 4);
        Ok(())
    }

    #[test]
    fn rewrite_class_reports_decision() {
        let config = FilterConfig {
            classes: vec!["com.example.Widget".to_string()],
            ..FilterConfig::default()
        };
        let rules = FilterRules::new(&config);
        let rewrite = rewrite_class(&rules, WIDGET).unwrap();
        assert_eq!(rewrite.class_name, "com.example.Widget");
        assert_eq!(rewrite.decision, Decision::IncludedClass);
        assert_eq!(
            rewrite.summary.as_ref().map(|s| s.methods.clone()),
            Some(vec!["draw()V".to_string()])
        );
        assert_ne!(rewrite.bytes, WIDGET);

        let untouched = rewrite_class(&FilterRules::default(), WIDGET).unwrap();
        assert!(untouched.summary.is_none());
        assert_eq!(untouched.bytes, WIDGET);
    }

    #[test]
    fn failed_class_write_falls_back_to_original_bytes() -> Result<()> {
        let mut written = Vec::new();
        let err = write_class(Path::new("A.class"), b"new", b"old", |path, data| {
            if data == b"new" {
                bail!("Failed to write file: {}", path.display());
            }
            written.push(data.to_vec());
            Ok(())
        })?;
        assert_eq!(
            err.map(|e| e.to_string()),
            Some("Failed to write file: A.class".to_string())
        );
        assert_eq!(written, vec![b"old".to_vec()]);

        let err = write_class(Path::new("A.class"), b"new", b"old", |_, _| Ok(()))?;
        assert!(err.is_none());
        Ok(())
    }

    #[test]
    fn failed_fallback_write_is_a_run_level_error() {
        let err = write_class(Path::new("A.class"), b"new", b"old", |path, _| {
            bail!("Failed to write file: {}", path.display())
        })
        .unwrap_err();
        assert!(format!("{err:#}").contains("Failed to write original bytes"));
    }

    #[test]
    fn rewrite_class_rejects_garbage() {
        let err = rewrite_class(&FilterRules::default(), b"garbage").unwrap_err();
        assert!(matches!(err, ClassFormatError::BadMagic(_)));
    }

    #[test]
    fn output_inside_input_is_refused() -> Result<()> {
        let dir = TempDir::new()?;
        write(dir.path(), "A.txt", b"a");
        let err = run(dir.path(), &dir.path().join("out"), &FilterConfig::default()).unwrap_err();
        assert!(err.to_string().contains("inside input root"));
        Ok(())
    }

    #[test]
    fn output_equal_to_input_is_refused() -> Result<()> {
        let dir = TempDir::new()?;
        write(dir.path(), "A.txt", b"a");
        let err = run(dir.path(), dir.path(), &FilterConfig::default()).unwrap_err();
        assert!(err.to_string().contains("refusing to clear"));
        assert!(dir.path().join("A.txt").exists());
        Ok(())
    }

    #[test]
    fn missing_input_is_a_run_level_error() -> Result<()> {
        let dir = TempDir::new()?;
        let err = run(
            &dir.path().join("missing"),
            &dir.path().join("out"),
            &FilterConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Failed to read input root"));
        Ok(())
    }

    #[test]
    fn input_file_is_a_run_level_error() -> Result<()> {
        let dir = TempDir::new()?;
        write(dir.path(), "in.txt", b"a");
        let err = run(
            &dir.path().join("in.txt"),
            &dir.path().join("out"),
            &FilterConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("not a directory"));
        Ok(())
    }
}
