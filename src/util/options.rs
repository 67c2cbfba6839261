// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Analysis options.

use clap::error::ErrorKind;
use clap::{Arg, Command};
use log::error;

use crate::error::Result;
use crate::pta::ContextSensitivity;

const PTA_USAGE: &str = r#"pta [OPTIONS] INPUT"#;

/// The environment variable holding extra options as a JSON array of strings.
pub const PTA_FLAGS_ENV: &str = "PTA_FLAGS";

/// Creates the clap::Command metadata for argument parsing.
fn make_options_parser() -> Command<'static> {
    Command::new("pta")
        .no_binary_name(true)
        .override_usage(PTA_USAGE)
        .version(env!("CARGO_PKG_VERSION"))
        .arg(Arg::new("context-sensitivity")
            .long("cs")
            .takes_value(true)
            .help("The context sensitivity variant: ci, <k>-call, <k>-obj or <k>-type.")
            .long_help("ci analyzes every method in a single context. <k>-call (alias <k>-cfa) \
                distinguishes the k most recent call sites, <k>-obj the k most recent receiver \
                objects and <k>-type the types of the k most recent receiver objects."))
        .arg(Arg::new("entry")
            .long("entry")
            .takes_value(true)
            .multiple_occurrences(true)
            .help("Signature of an entry method, e.g. `<Main: void main(java.lang.String[])>`.")
            .long_help("Overrides the entry methods declared by the input program. May be repeated."))
        .arg(Arg::new("merge-string-constants")
            .long("merge-string-constants")
            .takes_value(false)
            .help("Represent all string constants by a single object."))
        .arg(Arg::new("merge-string-objects")
            .long("merge-string-objects")
            .takes_value(false)
            .help("Merge String, StringBuilder and StringBuffer objects of the same type."))
        .arg(Arg::new("merge-exception-objects")
            .long("merge-exception-objects")
            .takes_value(false)
            .help("Merge Throwable objects of the same type."))
        .arg(Arg::new("dump-stats")
            .long("dump-stats")
            .takes_value(false)
            .help("Dump the statistics of the analysis results."))
        .arg(Arg::new("call-graph-output")
            .long("dump-call-graph")
            .takes_value(true)
            .help("Dump the call graph in DOT format to the output file."))
        .arg(Arg::new("pts-output")
            .long("dump-pts")
            .takes_value(true)
            .help("Dump points-to results to the output file, or to stdout if the file is `-`."))
        .arg(Arg::new("INPUT")
            .help("The JSON program to be analyzed."))
}

#[derive(Clone, Debug)]
pub struct AnalysisOptions {
    pub context_sensitivity: ContextSensitivity,
    /// Entry method signatures replacing the ones the program declares.
    pub entries: Vec<String>,

    // heap abstraction
    pub merge_string_constants: bool,
    pub merge_string_objects: bool,
    pub merge_exception_objects: bool,

    pub dump_stats: bool,
    pub call_graph_output: Option<String>,
    pub pts_output: Option<String>,
    pub input: Option<String>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            context_sensitivity: ContextSensitivity::Insensitive,
            entries: Vec::new(),
            merge_string_constants: false,
            merge_string_objects: false,
            merge_exception_objects: false,
            dump_stats: false,
            call_graph_output: None,
            pts_output: None,
            input: None,
        }
    }
}

impl AnalysisOptions {
    /// Parses options from a list of strings.
    ///
    /// Malformed command lines, `--help` and `--version` are reported by clap,
    /// which then exits the process.
    pub fn parse_from_args(&mut self, args: &[String]) -> Result<()> {
        let matches = match make_options_parser().try_get_matches_from(args.iter()) {
            Ok(matches) => matches,
            Err(e) => {
                if e.kind() != ErrorKind::DisplayHelp && e.kind() != ErrorKind::DisplayVersion {
                    error!("Invalid analysis options: {:?}", args);
                }
                e.exit();
            }
        };

        if let Some(cs) = matches.get_one::<String>("context-sensitivity") {
            self.context_sensitivity = cs.parse()?;
        }
        if let Some(entries) = matches.get_many::<String>("entry") {
            self.entries = entries.cloned().collect();
        }

        self.merge_string_constants |= matches.contains_id("merge-string-constants");
        self.merge_string_objects |= matches.contains_id("merge-string-objects");
        self.merge_exception_objects |= matches.contains_id("merge-exception-objects");

        self.dump_stats |= matches.contains_id("dump-stats");
        if let Some(output) = matches.get_one::<String>("call-graph-output") {
            self.call_graph_output = Some(output.clone());
        }
        if let Some(output) = matches.get_one::<String>("pts-output") {
            self.pts_output = Some(output.clone());
        }
        if let Some(input) = matches.get_one::<String>("INPUT") {
            self.input = Some(input.clone());
        }
        Ok(())
    }

    /// Parses the options held by the `PTA_FLAGS` environment variable, if set.
    pub fn parse_from_env(&mut self) -> Result<()> {
        match std::env::var(PTA_FLAGS_ENV) {
            Ok(flags) => {
                let args = parse_flags(&flags)?;
                self.parse_from_args(&args)
            }
            Err(_) => Ok(()),
        }
    }
}

/// Decodes the JSON array of strings held by `PTA_FLAGS`.
pub fn parse_flags(flags: &str) -> Result<Vec<String>> {
    Ok(serde_json::from_str::<Vec<String>>(flags)?)
}

#[cfg(test)]
mod test {
    use super::{parse_flags, AnalysisOptions};
    use crate::error::PtaError;
    use crate::pta::ContextSensitivity;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_a_full_command_line() {
        let mut options = AnalysisOptions::default();
        options
            .parse_from_args(&args(&[
                "--cs",
                "2-obj",
                "--entry",
                "<A: void main()>",
                "--entry",
                "<B: void run()>",
                "--merge-string-constants",
                "--dump-stats",
                "--dump-pts",
                "-",
                "prog.json",
            ]))
            .unwrap();
        assert_eq!(options.context_sensitivity, ContextSensitivity::Object(2));
        assert_eq!(options.entries, vec!["<A: void main()>", "<B: void run()>"]);
        assert!(options.merge_string_constants);
        assert!(!options.merge_string_objects);
        assert!(options.dump_stats);
        assert_eq!(options.pts_output.as_deref(), Some("-"));
        assert_eq!(options.input.as_deref(), Some("prog.json"));
    }

    #[test]
    fn later_sources_refine_earlier_ones() {
        let mut options = AnalysisOptions::default();
        options.parse_from_args(&args(&["--cs", "1-call"])).unwrap();
        options.parse_from_args(&args(&["--merge-exception-objects"])).unwrap();
        assert_eq!(options.context_sensitivity, ContextSensitivity::CallSite(1));
        assert!(options.merge_exception_objects);
    }

    #[test]
    fn rejects_unknown_variants() {
        let mut options = AnalysisOptions::default();
        let err = options.parse_from_args(&args(&["--cs", "2-foo"])).unwrap_err();
        assert!(matches!(err, PtaError::UnknownContextSensitivity(_)));
        let err = options.parse_from_args(&args(&["--cs", "0-obj"])).unwrap_err();
        assert!(matches!(err, PtaError::InvalidContextDepth(_)));
    }

    #[test]
    fn decodes_flags_from_json() {
        assert_eq!(parse_flags(r#"["--cs", "ci"]"#).unwrap(), args(&["--cs", "ci"]));
        assert!(matches!(parse_flags("--cs ci"), Err(PtaError::Json(_))));
    }
}
