use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use unitpack::archive::ArchiveInput;
use unitpack::pipeline::{self, PipelineInput};
use unitpack::{config, output};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "unitpack")]
#[command(about = "Batch-convert archives of image/text folders into structured packages")]
#[command(long_about = "\
Batch-convert archives of image/text folders into structured packages

Each input ZIP is scanned for units: folders whose children include an image
folder (and optionally a text folder). Detection stops at the first folder
that qualifies; nothing below it is searched.

Archive structure:

  batch.zip
  └── 2024/
      ├── Harbor/                         # unit
      │   ├── images/
      │   │   ├── P+ID7+Harbor - 1.jpg    # prefix+identifier+title - order
      │   │   └── P+ID7+Harbor - 2.png
      │   └── text/
      │       └── body.txt                # unit content
      └── Market/                         # unit (text folder optional)
          └── pics/
              └── P+ID8+Market.jpg

Outputs written to --out:
  repackaged.zip     every detected unit, one folder each
  units.csv          one row per parsed unit, one column per image
  data_package.zip   manifest.json plus normalized images

Run 'unitpack gen-config' to generate a documented unitpack.toml.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline and write all artifacts
    Run {
        /// ZIP files, or directories to search for ZIP files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(long, default_value = "unitpack-out")]
        out: PathBuf,

        /// Config file (stock defaults when absent)
        #[arg(long = "config", default_value = "unitpack.toml")]
        config_path: PathBuf,
    },
    /// List the units each archive contains without extracting them
    Detect {
        /// ZIP files, or directories to search for ZIP files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Print a stock unitpack.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            inputs,
            out,
            config_path,
        } => {
            let config = config::load_config(&config_path)?;
            let input = PipelineInput {
                archives: read_archives(&collect_archive_paths(&inputs)?)?,
            };

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    println!("{}", output::format_progress_event(&event));
                }
            });
            let result = pipeline::run(&input, &config, Some(tx));
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;

            output::print_run_summary(&result);
            if !result.success {
                return Err(result
                    .error
                    .unwrap_or_else(|| "run failed".to_string())
                    .into());
            }

            std::fs::create_dir_all(&out)?;
            for (name, bytes) in [
                (output::REPACKAGED_FILE, &result.repackaged_archive),
                (output::TABULAR_FILE, &result.tabular_export),
                (output::DATA_PACKAGE_FILE, &result.data_package),
            ] {
                if let Some(bytes) = bytes {
                    std::fs::write(out.join(name), bytes)?;
                }
            }
            println!("==> Output written to {}", out.display());
        }
        Command::Detect { inputs } => {
            for archive in read_archives(&collect_archive_paths(&inputs)?)? {
                match pipeline::scan_archive(&archive) {
                    Ok(units) => {
                        let infos: Vec<_> = units.iter().map(|u| u.info()).collect();
                        output::print_detect_output(&archive.name, &infos);
                    }
                    Err(e) => {
                        for line in output::format_detect_error(&archive.name, &e) {
                            println!("{}", line);
                        }
                    }
                }
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Expand the command line inputs into archive paths.
///
/// Files are taken as given. Directories are walked for `*.zip` files, sorted
/// by path so runs over the same directory are repeatable.
fn collect_archive_paths(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, walkdir::Error> {
    let mut paths = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            paths.push(input.clone());
            continue;
        }
        let mut found = Vec::new();
        for entry in WalkDir::new(input) {
            let entry = entry?;
            if entry.file_type().is_file() && is_zip(entry.path()) {
                found.push(entry.into_path());
            }
        }
        found.sort();
        paths.extend(found);
    }
    Ok(paths)
}

fn is_zip(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

fn read_archives(paths: &[PathBuf]) -> std::io::Result<Vec<ArchiveInput>> {
    paths
        .iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            Ok(ArchiveInput::new(name, std::fs::read(path)?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn directories_are_walked_for_zips_in_sorted_order() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("nested")).unwrap();
        std::fs::write(tmp.path().join("b.zip"), b"").unwrap();
        std::fs::write(tmp.path().join("a.ZIP"), b"").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), b"").unwrap();
        std::fs::write(tmp.path().join("nested/c.zip"), b"").unwrap();

        let paths = collect_archive_paths(&[tmp.path().to_path_buf()]).unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.strip_prefix(tmp.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.ZIP"),
                PathBuf::from("b.zip"),
                PathBuf::from("nested/c.zip"),
            ]
        );
    }

    #[test]
    fn explicit_files_are_kept_as_given() {
        let paths = collect_archive_paths(&[PathBuf::from("x/batch.zip")]).unwrap();
        assert_eq!(paths, vec![PathBuf::from("x/batch.zip")]);
    }

    #[test]
    fn archives_are_named_by_file_name() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("batch-01.zip");
        std::fs::write(&path, b"bytes").unwrap();

        let archives = read_archives(&[path]).unwrap();
        assert_eq!(archives[0].name, "batch-01.zip");
        assert_eq!(archives[0].bytes, b"bytes");
    }

    #[test]
    fn missing_archive_is_an_io_error() {
        let tmp = TempDir::new().unwrap();
        assert!(read_archives(&[tmp.path().join("absent.zip")]).is_err());
    }
}
