//! Parsing Options.
//! `--mode {mode}` or `-m`, selects which analyses are printed.

use clap::{Arg, Command, value_parser};
use std::error::Error;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    All,
    Simulate,
    Set,
    Tree,
    Matrix,
}

impl Mode {
    pub fn simulate(self) -> bool {
        matches!(self, Mode::All | Mode::Simulate)
    }

    pub fn set(self) -> bool {
        matches!(self, Mode::All | Mode::Set)
    }

    pub fn tree(self) -> bool {
        matches!(self, Mode::All | Mode::Tree)
    }

    pub fn matrix(self) -> bool {
        matches!(self, Mode::All | Mode::Matrix)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn make_options_parser() -> clap::Command {
    Command::new("petri-exam")
        .no_binary_name(true)
        .version("v0.1.0")
        .about("Simulates and analyses the exam workflow Petri net")
        .arg(
            Arg::new("mode")
                .short('m')
                .long("mode")
                .help("Which analyses to run")
                .default_value("all")
                .value_parser(["simulate", "set", "tree", "matrix", "all"]),
        )
        .arg(
            Arg::new("seed")
                .short('s')
                .long("seed")
                .value_name("N")
                .help("Random seed for the simulation")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("depth")
                .short('d')
                .long("depth")
                .value_name("N")
                .help("Maximum depth of the reachability tree")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("steps")
                .short('n')
                .long("steps")
                .value_name("N")
                .help("Maximum number of simulation steps")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file")
                .default_value("petri-exam.toml"),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .default_value("text")
                .value_parser(["text", "json"]),
        )
        .arg(
            Arg::new("dot-dir")
                .long("dot-dir")
                .value_name("DIR")
                .help("Directory where net.dot and tree.dot are written"),
        )
}

#[derive(Debug, Default)]
pub struct Options {
    pub mode: Mode,
    pub seed: Option<u64>,
    pub depth: Option<usize>,
    pub steps: Option<usize>,
    pub config: PathBuf,
    pub format: OutputFormat,
    pub dot_dir: Option<PathBuf>,
}

impl Options {
    pub fn parse_from_args(flags: &[String]) -> Result<Self, Box<dyn Error>> {
        let app = make_options_parser();
        let matches = app.try_get_matches_from(flags.iter())?;
        let mode = match matches.get_one::<String>("mode").map(String::as_str) {
            Some("all") => Mode::All,
            Some("simulate") => Mode::Simulate,
            Some("set") => Mode::Set,
            Some("tree") => Mode::Tree,
            Some("matrix") => Mode::Matrix,
            _ => return Err("UnsupportedMode".into()),
        };
        let format = match matches.get_one::<String>("format").map(String::as_str) {
            Some("json") => OutputFormat::Json,
            _ => OutputFormat::Text,
        };

        Ok(Options {
            mode,
            seed: matches.get_one::<u64>("seed").copied(),
            depth: matches.get_one::<usize>("depth").copied(),
            steps: matches.get_one::<usize>("steps").copied(),
            config: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_default(),
            format,
            dot_dir: matches.get_one::<String>("dot-dir").map(PathBuf::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_owned).collect()
    }

    #[test]
    fn defaults() {
        let options = Options::parse_from_args(&[]).unwrap();
        assert_eq!(options.mode, Mode::All);
        assert_eq!(options.format, OutputFormat::Text);
        assert_eq!(options.config, PathBuf::from("petri-exam.toml"));
        assert!(options.seed.is_none() && options.depth.is_none() && options.dot_dir.is_none());
    }

    #[test]
    fn parses_all_flags() {
        let options = Options::parse_from_args(&args(
            "-m tree -s 7 -d 4 -n 20 -c sim.toml -f json --dot-dir out",
        ))
        .unwrap();
        assert_eq!(options.mode, Mode::Tree);
        assert_eq!(options.seed, Some(7));
        assert_eq!(options.depth, Some(4));
        assert_eq!(options.steps, Some(20));
        assert_eq!(options.config, PathBuf::from("sim.toml"));
        assert_eq!(options.format, OutputFormat::Json);
        assert_eq!(options.dot_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn test_parse_from_args_err() {
        assert!(Options::parse_from_args(&args("-m unknown")).is_err());
        assert!(Options::parse_from_args(&args("-s minus-one")).is_err());
    }

    #[test]
    fn mode_selection() {
        assert!(Mode::All.simulate() && Mode::All.matrix());
        assert!(Mode::Set.set() && !Mode::Set.tree());
    }
}
