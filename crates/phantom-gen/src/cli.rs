use std::path::PathBuf;

use phantom_core::{BaseGeometry, ShapeKind};
use phantom_persist::HeaderMode;

use crate::error::RunError;
use crate::runner::{GenerationOptions, RunRequest};

/// Parsed command line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Generate(CliArgs),
    Help,
}

/// Arguments of a generation run, before any file is touched.
#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    pub output: PathBuf,
    pub object_type: Option<i32>,
    pub detector_pixels: Option<u32>,
    pub raw: bool,
    pub verify: bool,
    pub geometry: Option<PathBuf>,
    pub summary: Option<PathBuf>,
    pub slab_rows: Option<u32>,
    pub cavity_ratio: Option<f64>,
}

pub fn usage(program: &str) -> String {
    format!(
        "Usage:\n\t{program} output.dat [objectType] [n] [OPTIONS]\n\
         \x20- output.dat: file to store the phantom in (overwritten if present);\n\
         \x20- objectType: 1 (solid cube with spherical cavity), 2 (solid sphere) or 3 (solid cube), default 3;\n\
         \x20- n: detector pixels per side; every other length is derived from it. Defaults are used if absent.\n\
         Options:\n\
         \x20 --raw                  Omit the 64-byte header (not valid projector input)\n\
         \x20 --verify               Re-read the written header and check it\n\
         \x20 --geometry <file.ron>  Override the base scan constants\n\
         \x20 --summary <path>       Save the output summary as JSON\n\
         \x20 --slab-height <rows>   Y layers generated per slab (default 100)\n\
         \x20 --cavity-ratio <f>     Cavity radius as a fraction of the sphere radius (default 0.5)\n"
    )
}

/// Parse `args` (without the program name).
pub fn parse_args(args: &[String]) -> Result<Command, RunError> {
    let mut positionals: Vec<&str> = Vec::new();
    let mut raw = cfg!(feature = "raw");
    let mut verify = false;
    let mut geometry = None;
    let mut summary = None;
    let mut slab_rows = None;
    let mut cavity_ratio = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => return Ok(Command::Help),
            "--raw" => raw = true,
            "--verify" => verify = true,
            "--geometry" => {
                i += 1;
                geometry = Some(PathBuf::from(flag_value(args, i, "--geometry")?));
            }
            "--summary" => {
                i += 1;
                summary = Some(PathBuf::from(flag_value(args, i, "--summary")?));
            }
            "--slab-height" => {
                i += 1;
                let value = flag_value(args, i, "--slab-height")?;
                slab_rows = Some(parse_positive(value, "--slab-height")?);
            }
            "--cavity-ratio" => {
                i += 1;
                let value = flag_value(args, i, "--cavity-ratio")?;
                let ratio = value.parse::<f64>().map_err(|_| {
                    RunError::Usage(format!("invalid --cavity-ratio value: {value}"))
                })?;
                cavity_ratio = Some(ratio);
            }
            other if other.starts_with("--") => {
                return Err(RunError::Usage(format!("unknown argument: {other}")));
            }
            other => positionals.push(other),
        }
        i += 1;
    }

    if positionals.is_empty() || positionals.len() > 3 {
        return Err(RunError::Usage(format!(
            "expected 1 to 3 positional arguments, got {}",
            positionals.len()
        )));
    }

    let object_type = positionals
        .get(1)
        .map(|value| {
            value
                .parse::<i32>()
                .map_err(|_| RunError::Usage(format!("invalid object type: {value}")))
        })
        .transpose()?;
    let detector_pixels = positionals
        .get(2)
        .map(|value| parse_positive(value, "n"))
        .transpose()?;

    Ok(Command::Generate(CliArgs {
        output: PathBuf::from(positionals[0]),
        object_type,
        detector_pixels,
        raw,
        verify,
        geometry,
        summary,
        slab_rows,
        cavity_ratio,
    }))
}

fn flag_value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str, RunError> {
    args.get(i)
        .map(String::as_str)
        .ok_or_else(|| RunError::Usage(format!("{flag} requires a value")))
}

fn parse_positive(value: &str, name: &str) -> Result<u32, RunError> {
    match value.parse::<u32>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(RunError::Usage(format!(
            "{name} must be a positive integer, got {value}"
        ))),
    }
}

impl CliArgs {
    /// Load the base geometry (if a file was given) and build the run request.
    pub fn into_request(self) -> Result<RunRequest, RunError> {
        let base = match &self.geometry {
            Some(path) => {
                let contents =
                    std::fs::read_to_string(path).map_err(|source| RunError::GeometryFile {
                        path: path.clone(),
                        source,
                    })?;
                let base = BaseGeometry::from_ron_str(&contents)?;
                log::info!("Loaded base geometry from {}", path.display());
                base
            }
            None => BaseGeometry::default(),
        };

        let defaults = GenerationOptions::default();
        let options = GenerationOptions {
            shape: self
                .object_type
                .map(ShapeKind::from_object_type)
                .unwrap_or_default(),
            slab_rows: self.slab_rows.unwrap_or(defaults.slab_rows),
            cavity_ratio: self.cavity_ratio.unwrap_or(defaults.cavity_ratio),
            header_mode: if self.raw {
                HeaderMode::Raw
            } else {
                HeaderMode::Standard
            },
        };

        Ok(RunRequest {
            output: self.output,
            base,
            detector_pixels: self.detector_pixels,
            options,
            verify: self.verify,
        })
    }
}
