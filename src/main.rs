//! This crate simulates the BER-versus-SNR and FER-versus-SNR performance of a CRC-protected
//! channel code over a BPSK-AWGN channel, with one processing chain per worker thread. Simulation
//! parameters are specified on the command line, and simulation results are saved to a JSON file.
//!
//! Build the executable with `cargo build --release` and then run `./target/release/fecflow -h`
//! for help on the command-line interface. Set `RUST_LOG` (e.g., `RUST_LOG=debug`) to control the
//! log output.

#![warn(
    clippy::complexity,
    clippy::pedantic,
    clippy::perf,
    clippy::style,
    clippy::suspicious,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_allocation,
    unused_import_braces,
    unused_qualifications
)]

use std::sync::atomic::AtomicBool;
use std::time::Instant;

use anyhow::Result;
use clap::{crate_name, crate_version, value_parser, Arg, ArgMatches, Command};
use fecflow::bfer::{self, Code, SimParams};
use fecflow::DecodingAlgo;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Main function
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let timer = Instant::now();
    let matches = command_line_parser().get_matches();
    let all_params = all_sim_params(&matches)?;
    let json_filename = json_filename_from_matches(&matches);
    let stop = AtomicBool::new(false);
    let all_results = bfer::run_bpsk_awgn_sims(&all_params, &json_filename, &stop)?;
    info!(
        num_points = all_results.len(),
        json_filename = %json_filename,
        elapsed = ?timer.elapsed(),
        "Simulations done"
    );
    Ok(())
}

/// Returns command line parser.
fn command_line_parser() -> Command {
    Command::new(crate_name!())
        .version(crate_version!())
        .about("Evaluates the BER and FER of a CRC-protected code over a BPSK-AWGN channel")
        .arg(num_info_bits())
        .arg(crc_name())
        .arg(code_name())
        .arg(rep())
        .arg(code_polynomials())
        .arg(decoding_algo_name())
        .arg(n_frames())
        .arg(n_frames_per_wave())
        .arg(first_snr_db())
        .arg(snr_step_db())
        .arg(num_snr())
        .arg(interleaver_n_cols())
        .arg(n_threads())
        .arg(num_frame_errors_min())
        .arg(num_frames_max())
        .arg(seed())
        .arg(json_filename())
}

/// Returns argument for number of information bits per frame.
fn num_info_bits() -> Arg {
    Arg::new("num_info_bits")
        .short('K')
        .value_parser(value_parser!(usize))
        .default_value("32")
        .help("Number of information bits per frame, before CRC")
}

/// Returns argument for CRC name.
fn crc_name() -> Arg {
    Arg::new("crc_name")
        .short('c')
        .default_value("8-DVB-S2")
        .help("CRC name (e.g., 16-CCITT, or NO for no CRC)")
}

/// Returns argument for code name.
fn code_name() -> Arg {
    Arg::new("code_name")
        .short('C')
        .value_parser(["repetition", "rsc"])
        .default_value("rsc")
        .help("Channel code")
}

/// Returns argument for number of copies of the repetition code.
fn rep() -> Arg {
    Arg::new("rep")
        .short('R')
        .value_parser(value_parser!(usize))
        .default_value("3")
        .help("Number of copies of the repetition code")
}

/// Returns argument for code polynomials of the RSC code.
fn code_polynomials() -> Arg {
    Arg::new("code_polynomials")
        .short('g')
        .value_delimiter(',')
        .value_parser(parse_octal)
        .default_value("13,15")
        .help("Octal code polynomials of the RSC code, feedback polynomial first")
}

/// Returns argument for decoding algorithm name.
fn decoding_algo_name() -> Arg {
    Arg::new("decoding_algo_name")
        .short('a')
        .value_parser(["LogMAP", "MaxLogMAP", "LinearLogMAP"])
        .default_value("LogMAP")
        .help("Decoding algorithm name")
}

/// Returns argument for number of frames per batch.
fn n_frames() -> Arg {
    Arg::new("n_frames")
        .short('F')
        .value_parser(value_parser!(usize))
        .default_value("16")
        .help("Number of frames per batch")
}

/// Returns argument for number of frames per wave.
fn n_frames_per_wave() -> Arg {
    Arg::new("n_frames_per_wave")
        .short('w')
        .value_parser(value_parser!(usize))
        .default_value("4")
        .help("Number of frames per wave")
}

/// Returns argument for first Es/N0 (dB).
fn first_snr_db() -> Arg {
    Arg::new("first_snr_db")
        .short('r')
        .value_parser(value_parser!(f64))
        .allow_negative_numbers(true)
        .default_value("-3.0")
        .help("First Es/N0 (dB)")
}

/// Returns argument for Es/N0 step (dB).
fn snr_step_db() -> Arg {
    Arg::new("snr_step_db")
        .short('p')
        .value_parser(value_parser!(f64))
        .allow_negative_numbers(true)
        .default_value("1.0")
        .help("Es/N0 step (dB)")
}

/// Returns argument for number of Es/N0 values.
fn num_snr() -> Arg {
    Arg::new("num_snr")
        .short('s')
        .value_parser(value_parser!(u32))
        .default_value("4")
        .help("Number of Es/N0 values")
}

/// Returns argument for number of columns of the channel interleaver.
fn interleaver_n_cols() -> Arg {
    Arg::new("interleaver_n_cols")
        .short('I')
        .value_parser(value_parser!(usize))
        .help("Number of columns of the column-row channel interleaver (none if absent)")
}

/// Returns argument for number of worker threads.
fn n_threads() -> Arg {
    Arg::new("n_threads")
        .short('t')
        .value_parser(value_parser!(usize))
        .default_value("4")
        .help("Number of worker threads")
}

/// Returns argument for desired minimum number of frame errors.
fn num_frame_errors_min() -> Arg {
    Arg::new("num_frame_errors_min")
        .short('e')
        .value_parser(value_parser!(u64))
        .default_value("100")
        .help("Desired minimum number of frame errors")
}

/// Returns argument for maximum number of frames to be simulated.
fn num_frames_max() -> Arg {
    Arg::new("num_frames_max")
        .short('x')
        .value_parser(value_parser!(u64))
        .default_value("100000")
        .help("Maximum number of frames to be simulated")
}

/// Returns argument for seed of the random number generators.
fn seed() -> Arg {
    Arg::new("seed")
        .short('S')
        .value_parser(value_parser!(u64))
        .default_value("0")
        .help("Seed of the random number generators")
}

/// Returns argument for name of JSON file to which results must be saved.
fn json_filename() -> Arg {
    Arg::new("json_filename")
        .short('f')
        .default_value("results.json")
        .help("Name of JSON file to which results must be saved")
}

/// Parses an octal code polynomial.
fn parse_octal(s: &str) -> Result<usize, String> {
    usize::from_str_radix(s, 8).map_err(|e| format!("Invalid octal polynomial '{s}': {e}"))
}

/// Returns simulation parameters based on command-line arguments.
///
/// # Errors
///
/// Returns an error if the decoding algorithm name is unknown.
fn all_sim_params(matches: &ArgMatches) -> Result<Vec<SimParams>> {
    let code = code_from_matches(matches)?;
    Ok(all_es_over_n0_db_from_matches(matches)
        .into_iter()
        .map(|es_over_n0_db| SimParams {
            num_info_bits: usize_from_matches(matches, "num_info_bits"),
            crc_name: string_from_matches(matches, "crc_name"),
            code: code.clone(),
            n_frames: usize_from_matches(matches, "n_frames"),
            n_frames_per_wave: usize_from_matches(matches, "n_frames_per_wave"),
            es_over_n0_db,
            interleaver_n_cols: matches.get_one::<usize>("interleaver_n_cols").copied(),
            n_threads: usize_from_matches(matches, "n_threads"),
            num_frame_errors_min: u64_from_matches(matches, "num_frame_errors_min"),
            num_frames_max: u64_from_matches(matches, "num_frames_max"),
            seed: u64_from_matches(matches, "seed"),
        })
        .collect())
}

/// Returns channel code.
fn code_from_matches(matches: &ArgMatches) -> Result<Code> {
    Ok(match string_from_matches(matches, "code_name").as_str() {
        "repetition" => Code::Repetition {
            rep: usize_from_matches(matches, "rep"),
        },
        _ => Code::Rsc {
            code_polynomials: matches
                .get_many::<usize>("code_polynomials")
                .map(|polys| polys.copied().collect())
                .unwrap_or_default(),
            decoding_algo: decoding_algo_from_matches(matches)?,
        },
    })
}

/// Returns decoding algorithm.
fn decoding_algo_from_matches(matches: &ArgMatches) -> Result<DecodingAlgo> {
    match string_from_matches(matches, "decoding_algo_name").as_str() {
        "LogMAP" => Ok(DecodingAlgo::LogMAP),
        "MaxLogMAP" => Ok(DecodingAlgo::MaxLogMAP),
        "LinearLogMAP" => Ok(DecodingAlgo::LinearLogMAP),
        name => Err(anyhow::anyhow!("Invalid decoding algorithm name '{name}'")),
    }
}

/// Returns all Es/N0 (dB) values.
fn all_es_over_n0_db_from_matches(matches: &ArgMatches) -> Vec<f64> {
    let first_snr_db = matches.get_one::<f64>("first_snr_db").copied().unwrap_or_default();
    let snr_step_db = matches.get_one::<f64>("snr_step_db").copied().unwrap_or_default();
    let num_snr = matches.get_one::<u32>("num_snr").copied().unwrap_or_default();
    (0 .. num_snr)
        .map(|n| first_snr_db + snr_step_db * f64::from(n))
        .collect()
}

/// Returns value of an argument with a default `usize` value.
fn usize_from_matches(matches: &ArgMatches, id: &str) -> usize {
    matches.get_one::<usize>(id).copied().unwrap_or_default()
}

/// Returns value of an argument with a default `u64` value.
fn u64_from_matches(matches: &ArgMatches, id: &str) -> u64 {
    matches.get_one::<u64>(id).copied().unwrap_or_default()
}

/// Returns value of an argument with a default string value.
fn string_from_matches(matches: &ArgMatches, id: &str) -> String {
    matches.get_one::<String>(id).cloned().unwrap_or_default()
}

/// Returns name of JSON file to which simulation results must be saved.
fn json_filename_from_matches(matches: &ArgMatches) -> String {
    string_from_matches(matches, "json_filename")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command_line_for_test() -> Vec<&'static str> {
        vec![
            crate_name!(),
            "-K",
            "40",
            "-c",
            "16-CCITT",
            "-C",
            "rsc",
            "-g",
            "13,15,17",
            "-a",
            "MaxLogMAP",
            "-F",
            "10",
            "-w",
            "3",
            "-r",
            "-4.0",
            "-p",
            "0.2",
            "-s",
            "6",
            "-I",
            "8",
            "-t",
            "2",
            "-e",
            "50",
            "-x",
            "2000",
            "-S",
            "7",
            "-f",
            "results.json",
        ]
    }

    #[test]
    fn test_command_line_parser() {
        assert!(command_line_parser()
            .try_get_matches_from(command_line_for_test())
            .is_ok());
        assert!(command_line_parser()
            .try_get_matches_from([crate_name!(), "-g", "13,19"])
            .is_err());
        assert!(command_line_parser()
            .try_get_matches_from([crate_name!(), "-C", "ldpc"])
            .is_err());
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_all_sim_params() {
        let matches = command_line_parser().get_matches_from(command_line_for_test());
        let all_params = all_sim_params(&matches).unwrap();
        let all_es_over_n0_db = [-4.0, -3.8, -3.6, -3.4, -3.2, -3.0];
        assert_eq!(all_params.len(), 6);
        for (idx, params) in all_params.iter().enumerate() {
            assert_eq!(params.num_info_bits, 40);
            assert_eq!(params.crc_name, "16-CCITT");
            assert_eq!(
                params.code,
                Code::Rsc {
                    code_polynomials: vec![0o13, 0o15, 0o17],
                    decoding_algo: DecodingAlgo::MaxLogMAP
                }
            );
            assert_eq!(params.n_frames, 10);
            assert_eq!(params.n_frames_per_wave, 3);
            assert_eq!(params.es_over_n0_db, all_es_over_n0_db[idx]);
            assert_eq!(params.interleaver_n_cols, Some(8));
            assert_eq!(params.n_threads, 2);
            assert_eq!(params.num_frame_errors_min, 50);
            assert_eq!(params.num_frames_max, 2000);
            assert_eq!(params.seed, 7);
        }
    }

    #[test]
    fn test_all_sim_params_defaults() {
        let matches =
            command_line_parser().get_matches_from([crate_name!(), "-C", "repetition", "-R", "5"]);
        let all_params = all_sim_params(&matches).unwrap();
        assert_eq!(all_params.len(), 4);
        assert_eq!(all_params[0].code, Code::Repetition { rep: 5 });
        assert_eq!(all_params[0].interleaver_n_cols, None);
        assert_eq!(all_params[0].crc_name, "8-DVB-S2");
        assert_eq!(all_params[0].n_threads, 4);
    }
}
