use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

mod codegen;
mod config;
mod error;
mod grammar;
mod parser;
mod scanner;

use error::CompileError;

fn main() {
    let matches = build_cli().get_matches();

    if let Err(e) = run(&matches) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn build_cli() -> Command {
    Command::new("obcsimc")
        .version("0.1.0")
        .about("Compiles an OBC simulator configuration script into the generated C++ sources")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration script to compile")
                .default_value("config.txt")
                .value_parser(value_parser!(String)),
        )
        .arg(
            Arg::new("out-dir")
                .short('o')
                .long("out-dir")
                .value_name("DIR")
                .help("Directory the generated files are written to")
                .default_value("target/obcsim")
                .value_parser(value_parser!(String)),
        )
        .arg(
            Arg::new("check")
                .long("check")
                .help("Only validate the script, don't write the generated files")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dump-config")
                .long("dump-config")
                .help("Dump the validated configuration for debugging")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(ArgAction::Count),
        )
}

fn run(matches: &ArgMatches) -> Result<(), CompileError> {
    let config_file = matches.get_one::<String>("config").unwrap();
    let out_dir = matches.get_one::<String>("out-dir").unwrap();
    let check_only = matches.get_flag("check");
    let dump_config = matches.get_flag("dump-config");
    let verbose = matches.get_count("verbose") > 0;

    compile_script(
        Path::new(config_file),
        &PathBuf::from(out_dir),
        check_only,
        dump_config,
        verbose,
    )
}

/// One complete compiler run: scan, parse, validate, render, stage. Both
/// artifacts are rendered before either file is written, and a failed second
/// write removes the first, so the output directory always ends up with both
/// files or neither.
fn compile_script(
    config_file: &Path,
    out_dir: &Path,
    check_only: bool,
    dump_config: bool,
    verbose: bool,
) -> Result<(), CompileError> {
    let lines = scanner::scan_file(config_file)?;
    let configuration = parser::parse(&lines)?;

    if dump_config {
        println!("{:#?}", configuration);
    }

    if verbose {
        println!(
            "parsed {}: {} commands, {} init actions, {} loop actions",
            config_file.display(),
            configuration.commands.len(),
            configuration.sequence(config::SequenceKind::Init).len(),
            configuration.sequence(config::SequenceKind::Loop).len(),
        );
    }

    if check_only {
        println!("{}: configuration OK", config_file.display());
        return Ok(());
    }

    let artifacts = codegen::emit(&configuration);

    fs::create_dir_all(out_dir)?;
    let header_path = out_dir.join(codegen::HEADER_FILE_NAME);
    let source_path = out_dir.join(codegen::SOURCE_FILE_NAME);
    fs::write(&header_path, &artifacts.header)?;
    if let Err(e) = fs::write(&source_path, &artifacts.source) {
        let _ = fs::remove_file(&header_path);
        return Err(e.into());
    }

    if verbose {
        println!("wrote {}", header_path.display());
        println!("wrote {}", source_path.display());
    }

    Ok(())
}
