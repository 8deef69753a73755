//! Integration tests for argument parsing, input selection and full builds.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use clap::Parser;
use clap::error::ErrorKind;
use playgraph::cli::{
    BuildOptions, Cli, EXIT_FAILURE, EXIT_SUCCESS, OutputFormat, cmd_build, default_output,
    discover_input_files, execute, exit_code, parse_args,
};
use playgraph::config::Settings;
use playgraph_core::{
    NodeKind, PlaygraphError, RedbGraphStore, StoreMode, SummaryReport, read_snapshot,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_collection(dir: &Path, name: &str, slice: &str, playlists: &[&[(&str, &str)]]) {
    let lists: Vec<String> = playlists
        .iter()
        .map(|tracks| {
            let entries: Vec<String> = tracks
                .iter()
                .map(|(track, artist)| {
                    format!(r#"{{"track_uri": "{track}", "artist_uri": "{artist}", "pos": 0}}"#)
                })
                .collect();
            format!(r#"{{"name": "mix", "tracks": [{}]}}"#, entries.join(", "))
        })
        .collect();
    fs::write(
        dir.join(name),
        format!(
            r#"{{"info": {{"slice": "{slice}"}}, "playlists": [{}]}}"#,
            lists.join(", ")
        ),
    )
    .unwrap();
}

/// Two files holding the reference playlists, plus a third that the
/// default range leaves out.
fn data_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_collection(
        dir.path(),
        "mpd.slice.0-0.json",
        "0-0",
        &[&[("A", "x"), ("B", "y"), ("C", "y")]],
    );
    write_collection(
        dir.path(),
        "mpd.slice.1-1.json",
        "1-1",
        &[&[("B", "y"), ("C", "y"), ("D", "z")]],
    );
    write_collection(
        dir.path(),
        "mpd.slice.2-2.json",
        "2-2",
        &[&[("E", "w"), ("F", "v")]],
    );
    fs::write(dir.path().join("notes.txt"), "not a collection").unwrap();
    dir
}

fn options_for(args: &[&str]) -> BuildOptions {
    let mut argv = vec!["playgraph", "--quiet"];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).unwrap();
    BuildOptions::resolve(&cli, &Settings::default()).unwrap()
}

// =============================================================================
// ARGUMENT PARSING
// =============================================================================

#[test]
fn test_defaults() {
    let cli = Cli::try_parse_from(["playgraph"]).unwrap();
    assert_eq!(cli.start, 0);
    assert_eq!(cli.end, None);
    assert_eq!(cli.node_type, NodeKind::Artist);
    assert_eq!(cli.format, OutputFormat::Graphml);
    assert!(!cli.lenient);
    assert_eq!(
        default_output(cli.node_type, cli.format),
        PathBuf::from("artist_graph.graphml")
    );
}

#[test]
fn test_long_flags() {
    let cli = Cli::try_parse_from([
        "playgraph",
        "--directory",
        "mpd",
        "--start",
        "3",
        "--end",
        "7",
        "--type",
        "track",
        "--format",
        "edge-list",
        "--jobs",
        "4",
        "--lenient",
    ])
    .unwrap();
    assert_eq!(cli.directory, Some(PathBuf::from("mpd")));
    assert_eq!(cli.start, 3);
    assert_eq!(cli.end, Some(7));
    assert_eq!(cli.node_type, NodeKind::Track);
    assert_eq!(cli.format, OutputFormat::EdgeList);
    assert_eq!(cli.jobs, Some(4));
    assert!(cli.lenient);
}

#[test]
fn test_help_is_not_a_failure() {
    let err = Cli::try_parse_from(["playgraph", "--help"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DisplayHelp);
}

#[test]
fn test_bad_values_rejected() {
    assert!(Cli::try_parse_from(["playgraph", "--type", "album"]).is_err());
    assert!(Cli::try_parse_from(["playgraph", "--start", "-1"]).is_err());
    assert!(Cli::try_parse_from(["playgraph", "--format", "csv"]).is_err());
}

#[test]
fn test_flags_override_settings() {
    let settings = Settings::from_toml_str(
        "data_dir = \"from-config\"\njobs = 3\ntop_k = 5\nbatch_size = 50\n",
    )
    .unwrap();
    let cli = Cli::try_parse_from(["playgraph", "--jobs", "2", "--lenient"]).unwrap();
    let options = BuildOptions::resolve(&cli, &settings).unwrap();

    assert_eq!(options.directory, PathBuf::from("from-config"));
    assert_eq!(options.pipeline.jobs, 2);
    assert!(!options.pipeline.strict);
    assert_eq!(options.top_k, 5);
    assert_eq!(options.batch_size, 50);
}

#[test]
fn test_zero_batch_size_rejected() {
    let cli = Cli::try_parse_from(["playgraph", "--batch-size", "0"]).unwrap();
    let result = BuildOptions::resolve(&cli, &Settings::default());
    assert!(matches!(result, Err(PlaygraphError::InvalidArgument(_))));
}

// =============================================================================
// INPUT SELECTION
// =============================================================================

#[test]
fn test_discovery_sorted_json_only() {
    let dir = data_dir();
    fs::create_dir(dir.path().join("nested.json")).unwrap();

    let files = discover_input_files(dir.path()).unwrap();
    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec!["mpd.slice.0-0.json", "mpd.slice.1-1.json", "mpd.slice.2-2.json"]
    );
}

#[test]
fn test_missing_directory_rejected() {
    let dir = TempDir::new().unwrap();
    let result = discover_input_files(&dir.path().join("absent"));
    assert!(matches!(result, Err(PlaygraphError::InvalidArgument(_))));
}

// =============================================================================
// FULL BUILDS
// =============================================================================

#[test]
fn test_build_graphml_reference() {
    let data = data_dir();
    let out = TempDir::new().unwrap();
    let output = out.path().join("graphs").join("tracks.graphml");

    let options = options_for(&[
        "-d",
        data.path().to_str().unwrap(),
        "-t",
        "track",
        "-o",
        output.to_str().unwrap(),
    ]);
    let report = cmd_build(&options).unwrap();

    assert_eq!(report.files.len(), 2);
    assert_eq!(report.node_count, 4);
    assert_eq!(report.edge_count, 5);
    assert_eq!(report.output.location.as_deref(), Some(output.as_path()));

    let doc = fs::read_to_string(&output).unwrap();
    assert_eq!(doc.matches("<node ").count(), 4);
    assert_eq!(doc.matches("<edge ").count(), 5);

    let SummaryReport::Weights(summary) = &report.summary else {
        panic!("expected weights");
    };
    assert_eq!(summary.max, 2);
    assert_eq!(summary.top[0].pair.to_string(), "B -- C");
}

#[test]
fn test_build_artist_edge_list() {
    let data = data_dir();
    let out = TempDir::new().unwrap();
    let output = out.path().join("artists.txt");

    let options = options_for(&[
        "-d",
        data.path().to_str().unwrap(),
        "-f",
        "edge-list",
        "-o",
        output.to_str().unwrap(),
    ]);
    cmd_build(&options).unwrap();

    // Playlist 0: {x, y}; playlist 1: {y, z}.
    assert_eq!(fs::read_to_string(&output).unwrap(), "x\ty\t1\ny\tz\t1\n");
}

#[test]
fn test_build_redb_matches_snapshot() {
    let data = data_dir();
    let out = TempDir::new().unwrap();
    let db = out.path().join("tracks.redb");
    let snapshot = out.path().join("tracks.pgrf");
    let dir = data.path().to_str().unwrap();

    cmd_build(&options_for(&[
        "-d", dir, "-e", "2", "-t", "track", "-f", "redb", "--batch-size", "2", "-o",
        db.to_str().unwrap(),
    ]))
    .unwrap();
    cmd_build(&options_for(&[
        "-d", dir, "-e", "2", "-t", "track", "-f", "snapshot", "-o",
        snapshot.to_str().unwrap(),
    ]))
    .unwrap();

    let aggregate = read_snapshot(&snapshot).unwrap();
    let store = RedbGraphStore::open(&db, StoreMode::Append, 10).unwrap();
    assert_eq!(store.edges().unwrap(), aggregate.to_edges());
    assert_eq!(store.node_count().unwrap(), 6);
}

#[test]
fn test_out_of_range_end_rejected() {
    let data = data_dir();
    let options = options_for(&["-d", data.path().to_str().unwrap(), "-e", "3"]);
    assert!(matches!(
        cmd_build(&options),
        Err(PlaygraphError::InvalidArgument(_))
    ));
}

#[test]
fn test_parallel_build_matches_sequential() {
    let data = data_dir();
    let out = TempDir::new().unwrap();
    let dir = data.path().to_str().unwrap();
    let seq = out.path().join("seq.txt");
    let par = out.path().join("par.txt");

    cmd_build(&options_for(&[
        "-d", dir, "-e", "2", "-f", "edge-list", "-o", seq.to_str().unwrap(),
    ]))
    .unwrap();
    cmd_build(&options_for(&[
        "-d", dir, "-e", "2", "-f", "edge-list", "-j", "3", "-o", par.to_str().unwrap(),
    ]))
    .unwrap();

    assert_eq!(
        fs::read_to_string(&seq).unwrap(),
        fs::read_to_string(&par).unwrap()
    );
}

// =============================================================================
// EXIT CODES
// =============================================================================

fn run(args: &[&str]) -> u8 {
    let mut argv = vec!["playgraph", "--quiet"];
    argv.extend_from_slice(args);
    match parse_args(argv) {
        Ok(cli) => exit_code(execute(cli)),
        Err(code) => code,
    }
}

#[test]
fn test_exit_zero_for_help_and_version() {
    assert_eq!(parse_args(["playgraph", "--help"]).unwrap_err(), EXIT_SUCCESS);
    assert_eq!(parse_args(["playgraph", "--version"]).unwrap_err(), EXIT_SUCCESS);
}

#[test]
fn test_exit_one_for_parse_error() {
    assert_eq!(run(&["--type", "album"]), EXIT_FAILURE);
    assert_eq!(run(&["--no-such-flag"]), EXIT_FAILURE);
}

#[test]
fn test_exit_one_for_invalid_directory() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent");
    assert_eq!(run(&["-d", missing.to_str().unwrap()]), EXIT_FAILURE);
}

#[test]
fn test_exit_one_for_invalid_range() {
    let data = data_dir();
    let dir = data.path().to_str().unwrap();
    assert_eq!(run(&["-d", dir, "-e", "3"]), EXIT_FAILURE);
    assert_eq!(run(&["-d", dir, "-s", "2", "-e", "1"]), EXIT_FAILURE);
}

#[test]
fn test_exit_zero_for_successful_build() {
    let data = data_dir();
    let out = TempDir::new().unwrap();
    let output = out.path().join("g.graphml");
    assert_eq!(
        run(&[
            "-d",
            data.path().to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ]),
        EXIT_SUCCESS
    );
    assert!(output.is_file());
}
