//! CLI command implementations

use super::output::{OutputEvent, OutputHandler};
use crate::cache::{ArtifactStore, FsStore, IterationCache, MemoryStore};
use crate::config::{StylefitConfig, load_options};
use crate::oracle::{ClangFormat, DiffOracle, DiffProgram, FormatterOracle};
use crate::sample::SourceSample;
use crate::search::{GreedySearch, SearchSettings};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Infer a style for `inputs` and write it to the configured output path
pub async fn infer(
    inputs: &[PathBuf],
    config: &StylefitConfig,
    no_cache: bool,
    handler: &dyn OutputHandler,
) -> Result<i32, String> {
    let search = &config.search;

    let sample = SourceSample::assemble(&search.dump_dir, inputs)
        .map_err(|e| format!("Failed to assemble source sample: {}", e))?;
    let options = load_options(&search.options).map_err(|e| e.to_string())?;

    handler.emit(OutputEvent::RunStart {
        inputs: inputs.len(),
        lines: sample.line_count,
        options: options.len(),
        sample_changed: sample.dirty,
    });

    let store: Arc<dyn ArtifactStore> = if no_cache {
        Arc::new(MemoryStore::new())
    } else {
        let root = sample.path.parent().unwrap_or(search.dump_dir.as_path());
        handler.emit(OutputEvent::Debug {
            message: format!("artifact cache at {}", root.display()),
        });
        Arc::new(FsStore::new(root, sample.extension.as_deref()))
    };
    let cache = IterationCache::new(store, &sample);

    let formatter: Arc<dyn FormatterOracle> = Arc::new(ClangFormat::from_config(&config.formatter));
    let differ: Arc<dyn DiffOracle> = Arc::new(DiffProgram::from_config(&config.diff));
    let settings = SearchSettings {
        max_concurrent: search.concurrency(),
    };
    tracing::debug!(
        formatter = formatter.name(),
        diff = differ.name(),
        max_concurrent = settings.max_concurrent,
        "starting search"
    );

    let engine = GreedySearch::new(sample, cache, formatter, differ, &settings);
    let report = engine
        .run(&options, handler)
        .await
        .map_err(|e| format!("Search failed: {}", e))?;

    let rendered = report
        .style
        .to_yaml()
        .map_err(|e| format!("Failed to render style: {}", e))?;
    write_result(&search.output, &rendered)?;
    tracing::info!(path = %search.output.display(), keys = report.style.len(), "wrote style");

    handler.result(true, Some(&rendered));
    Ok(0)
}

fn write_result(path: &Path, rendered: &str) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
    }
    std::fs::write(path, rendered)
        .map_err(|e| format!("Failed to write {}: {}", path.display(), e))
}

/// Check that the formatter and diff programs can be found
pub async fn doctor(config: &StylefitConfig, handler: &dyn OutputHandler) -> i32 {
    handler.emit(OutputEvent::Info {
        message: "Checking external programs...".into(),
    });

    let formatter = ClangFormat::from_config(&config.formatter);
    let differ = DiffProgram::from_config(&config.diff);

    let checks = [
        ("formatter", formatter.name(), formatter.is_available().await),
        ("diff", differ.name(), differ.is_available().await),
    ];

    let mut all_ok = true;
    for (role, command, found) in checks {
        let status = if found {
            format!("✓ {} ({})", role, command)
        } else {
            all_ok = false;
            format!("✗ {} ({} - not found)", role, command)
        };
        handler.emit(OutputEvent::Info { message: status });
    }

    handler.emit(OutputEvent::Info {
        message: format!(
            "\nOption list: {}{}",
            config.search.options.display(),
            if config.search.options.exists() { "" } else { " (missing)" }
        ),
    });

    if all_ok { 0 } else { 1 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::output::tests::MockHandler;
    use crate::config::{DiffConfig, FormatterConfig, SearchConfig};
    use tempfile::TempDir;

    /// Formatter that indents every line when asked for tabs, else echoes its input
    const FAKE_FORMATTER: &str = "case \"$*\" in *Always*) sed 's/^/    /' ;; *) cat ;; esac";

    fn config(dir: &TempDir, formatter: &str) -> StylefitConfig {
        StylefitConfig {
            formatter: FormatterConfig {
                command: "sh".into(),
                args: vec!["-c".into(), formatter.into(), "sh".into()],
            },
            diff: DiffConfig::default(),
            search: SearchConfig {
                dump_dir: dir.path().join("work"),
                options: dir.path().join("options.yml"),
                output: dir.path().join("out").join(".clang-format"),
                max_concurrent: Some(2),
            },
        }
    }

    fn fixture(dir: &TempDir) -> Vec<PathBuf> {
        std::fs::write(dir.path().join("options.yml"), "- UseTab: [Never, Always]\n").unwrap();
        let input = dir.path().join("main.cpp");
        std::fs::write(&input, "int main() {\n  return 0;\n}\n").unwrap();
        vec![input]
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_infer_writes_style() {
        let dir = TempDir::new().unwrap();
        let inputs = fixture(&dir);
        let config = config(&dir, FAKE_FORMATTER);
        let handler = MockHandler::new();

        let code = infer(&inputs, &config, false, &handler).await.unwrap();

        assert_eq!(code, 0);
        let written = std::fs::read_to_string(&config.search.output).unwrap();
        assert_eq!(written, "UseTab: Never\n");
        assert_eq!(handler.results(), vec![(true, Some(written))]);
        assert!(dir.path().join("work/input.cpp").exists());
        assert!(dir.path().join("work/iter1/Never/.clang-format").exists());
        assert!(matches!(
            handler.events()[0],
            OutputEvent::RunStart {
                inputs: 1,
                lines: 4,
                options: 1,
                sample_changed: true,
            }
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_infer_without_cache() {
        let dir = TempDir::new().unwrap();
        let inputs = fixture(&dir);
        let config = config(&dir, FAKE_FORMATTER);
        let handler = MockHandler::new();

        let code = infer(&inputs, &config, true, &handler).await.unwrap();

        assert_eq!(code, 0);
        assert!(!dir.path().join("work/iter1").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_infer_formatter_failure() {
        let dir = TempDir::new().unwrap();
        let inputs = fixture(&dir);
        let config = config(&dir, "cat >/dev/null");
        let handler = MockHandler::new();

        let err = infer(&inputs, &config, false, &handler).await.unwrap_err();

        assert!(err.contains("invalid option?"), "{}", err);
        assert!(err.contains("UseTab=Never"), "{}", err);
        assert!(!config.search.output.exists());
    }

    #[tokio::test]
    async fn test_infer_no_inputs() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir, FAKE_FORMATTER);
        let handler = MockHandler::new();

        let err = infer(&[], &config, false, &handler).await.unwrap_err();

        assert!(err.contains("no input files"));
        assert!(handler.events().is_empty());
    }

    #[tokio::test]
    async fn test_infer_missing_options() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.c");
        std::fs::write(&input, "int a;\n").unwrap();
        let config = config(&dir, FAKE_FORMATTER);
        let handler = MockHandler::new();

        let result = infer(&[input], &config, false, &handler).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_doctor_missing_programs() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir, FAKE_FORMATTER);
        config.formatter.command = "definitely_not_a_real_formatter_12345".into();
        config.diff.command = "definitely_not_a_real_diff_12345".into();
        let handler = MockHandler::new();

        let code = doctor(&config, &handler).await;

        assert_eq!(code, 1);
        assert_eq!(handler.events().len(), 4);
    }
}
