//! qsort-step: resumable quicksort from the command line
//!
//! `init` writes a fresh checkpoint, `step` advances it by one unit of work
//! (recording the answer to the previous request first), `show` prints it,
//! and `sort` drives whole value files to completion.

use std::cmp::Ordering;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::process;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use tracing::info;
use tracing_subscriber::EnvFilter;

use restful_qsort::{
    codec,
    config::{CompareMode, SortConfig, SortConfigBuilder},
    driver::Driver,
    error::{SortContext, SortError, SortResult},
    values::ValueFile,
    Phase, QuickSortState, RandomPivot, EXIT_SUCCESS,
};

fn main() {
    let matches = build_cli().get_matches();
    init_logging(debug_requested(&matches));

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let result = dispatch(&matches, &mut out).and_then(|code| {
        out.flush()?;
        Ok(code)
    });

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            let _ = out.flush();
            eprintln!("qsort-step: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("restful_qsort=debug,qsort_step=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn debug_requested(matches: &ArgMatches) -> bool {
    matches.get_flag("debug")
        || matches
            .subcommand()
            .map_or(false, |(_, sub)| sub.get_flag("debug"))
}

fn build_cli() -> Command {
    let state_arg = || {
        Arg::new("state")
            .help("Checkpoint file holding the sort state")
            .value_name("STATE")
            .required(true)
    };

    Command::new("qsort-step")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Resumable quicksort driven one comparison at a time")
        .long_about("Resumable quicksort driven one comparison at a time.\n\nThe sort state lives in a checkpoint file. Each `step` records the answer to the last requested comparison, advances the sort by one unit of work and prints the next request (`compare A B`: order element A against element B) or the final order (`sorted ...`).")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(Arg::new("debug")
            .long("debug")
            .global(true)
            .help("Log protocol transitions to stderr")
            .action(ArgAction::SetTrue))

        .subcommand(Command::new("init")
            .about("Write a fresh sort state")
            .arg(state_arg())
            .arg(Arg::new("count")
                .short('n')
                .long("count")
                .help("Number of elements to sort")
                .value_name("N")
                .value_parser(value_parser!(u32))
                .required_unless_present("values")
                .conflicts_with("values"))
            .arg(Arg::new("values")
                .long("values")
                .help("Take the element count from the lines of FILE")
                .value_name("FILE")))

        .subcommand(Command::new("step")
            .about("Advance a sort state by one step")
            .arg(state_arg())
            .arg(Arg::new("result")
                .short('r')
                .long("result")
                .help("Answer to the pending comparison")
                .value_name("RESULT")
                .value_parser(["less", "greater", "equal"]))
            .arg(Arg::new("seed")
                .long("seed")
                .help("Seed for the pivot chosen if this step starts a partition")
                .value_name("SEED")
                .value_parser(value_parser!(u64))))

        .subcommand(Command::new("show")
            .about("Print a sort state")
            .arg(state_arg()))

        .subcommand(Command::new("sort")
            .about("Sort value files to completion, each file independently")
            .arg(Arg::new("files")
                .help("Value files, one value per line (use '-' or omit for stdin)")
                .num_args(0..)
                .value_name("FILE"))
            .arg(Arg::new("numeric-sort")
                .short('n')
                .long("numeric-sort")
                .help("Compare according to numerical value")
                .action(ArgAction::SetTrue))
            .arg(Arg::new("sort")
                .long("sort")
                .help("Compare according to WORD: lexicographic, numeric")
                .value_name("WORD")
                .value_parser(["lexicographic", "numeric"]))
            .arg(Arg::new("reverse")
                .short('r')
                .long("reverse")
                .help("Reverse the result of comparisons")
                .action(ArgAction::SetTrue))
            .arg(Arg::new("seed")
                .long("seed")
                .help("Seed pivot selection for reproducible runs")
                .value_name("SEED")
                .value_parser(value_parser!(u64)))
            .arg(Arg::new("checkpoint")
                .short('c')
                .long("checkpoint")
                .help("Resume from and persist progress to FILE")
                .value_name("FILE"))
            .arg(Arg::new("checkpoint-every")
                .long("checkpoint-every")
                .help("Persist progress every N steps")
                .value_name("N")
                .value_parser(value_parser!(u64)))
            .arg(Arg::new("max-steps")
                .long("max-steps")
                .help("Stop (keeping the checkpoint) after N steps")
                .value_name("N")
                .value_parser(value_parser!(u64)))
            .arg(Arg::new("parallel")
                .long("parallel")
                .help("Sort up to N files concurrently")
                .value_name("N")
                .value_parser(value_parser!(usize)))
            .arg(Arg::new("output")
                .short('o')
                .long("output")
                .help("Write result to FILE instead of standard output")
                .value_name("FILE")))
}

fn dispatch<W: Write>(matches: &ArgMatches, out: &mut W) -> SortResult<i32> {
    match matches.subcommand() {
        Some(("init", sub)) => run_init(sub, out),
        Some(("step", sub)) => run_step(sub, out),
        Some(("show", sub)) => run_show(sub, out),
        Some(("sort", sub)) => {
            let config = parse_sort_config(sub)?;
            run_sort(&config, out)
        }
        _ => Err(SortError::parse_error("missing subcommand")),
    }
}

fn state_path(matches: &ArgMatches) -> SortResult<&String> {
    matches
        .get_one::<String>("state")
        .ok_or_else(|| SortError::parse_error("missing state file"))
}

fn run_init<W: Write>(matches: &ArgMatches, out: &mut W) -> SortResult<i32> {
    let path = state_path(matches)?;
    let n = match matches.get_one::<u32>("count") {
        Some(&n) => n,
        None => {
            let values = matches
                .get_one::<String>("values")
                .ok_or_else(|| SortError::parse_error("either --count or --values is required"))?;
            ValueFile::open(values)?.count()?
        }
    };

    codec::save(path, &QuickSortState::new(n))?;
    writeln!(out, "initialized {n} elements in {path}")?;
    Ok(EXIT_SUCCESS)
}

fn run_step<W: Write>(matches: &ArgMatches, out: &mut W) -> SortResult<i32> {
    let path = state_path(matches)?;
    let mut state = codec::load(path)?;

    if let Some(result) = matches.get_one::<String>("result") {
        state.answer(parse_result(result)?)?;
    }

    let mut pivots = RandomPivot::for_step(matches.get_one::<u64>("seed").copied(), &state);
    let next = state.step(&mut pivots)?;
    codec::save(path, &next)?;

    writeln!(out, "{}", describe_next(&next))?;
    Ok(EXIT_SUCCESS)
}

fn run_show<W: Write>(matches: &ArgMatches, out: &mut W) -> SortResult<i32> {
    let state = codec::load(state_path(matches)?)?;
    write!(out, "{}", describe_state(&state))?;
    Ok(EXIT_SUCCESS)
}

fn parse_result(word: &str) -> SortResult<Ordering> {
    match word {
        "less" => Ok(Ordering::Less),
        "greater" => Ok(Ordering::Greater),
        "equal" => Ok(Ordering::Equal),
        _ => Err(SortError::parse_error(&format!("invalid comparison result: {word}"))),
    }
}

fn join_ids(ids: &[u32]) -> String {
    ids.iter().map(u32::to_string).collect::<Vec<_>>().join(" ")
}

/// One line telling the caller what to do next
fn describe_next(state: &QuickSortState) -> String {
    match state.phase() {
        Phase::Done => format!("sorted {}", join_ids(&state.arr)),
        Phase::AwaitingComparison(request) => {
            format!("compare {} {}", request.operand_id, request.pivot_id)
        }
        Phase::HaveResult(request, result) => format!(
            "answered {} {} {:?}",
            request.operand_id, request.pivot_id, result
        ),
        Phase::Init => "ready".to_string(),
    }
}

fn describe_state(state: &QuickSortState) -> String {
    let phase = match state.phase() {
        Phase::Init => "init".to_string(),
        Phase::AwaitingComparison(request) => format!("awaiting comparison ({:?})", request.side),
        Phase::HaveResult(request, result) => {
            format!("have result ({:?}, {:?})", request.side, result)
        }
        Phase::Done => "sorted".to_string(),
    };
    let top = if state.stack_is_empty() {
        "empty".to_string()
    } else {
        state.top.to_string()
    };

    format!(
        "phase: {phase}\nn: {}\narr: {}\nstack: {}\ntop: {top}\np: {} i: {} j: {}\nnext: {}\n",
        state.n,
        join_ids(&state.arr),
        join_ids(&state.stack),
        state.p,
        state.i,
        state.j,
        describe_next(state)
    )
}

/// Parse configuration for the sort subcommand
fn parse_sort_config(matches: &ArgMatches) -> SortResult<SortConfig> {
    let mut builder = SortConfigBuilder::new();

    let mode = if matches.get_flag("numeric-sort") {
        CompareMode::Numeric
    } else if let Some(word) = matches.get_one::<String>("sort") {
        word.parse()?
    } else {
        CompareMode::Lexicographic
    };
    builder = builder.mode(mode);

    if matches.get_flag("reverse") {
        builder = builder.reverse();
    }
    if let Some(&seed) = matches.get_one::<u64>("seed") {
        builder = builder.seed(seed);
    }
    if let Some(path) = matches.get_one::<String>("checkpoint") {
        builder = builder.checkpoint(path.clone());
    }
    if let Some(&every) = matches.get_one::<u64>("checkpoint-every") {
        builder = builder.checkpoint_interval(every);
    }
    if let Some(&limit) = matches.get_one::<u64>("max-steps") {
        builder = builder.max_steps(limit);
    }
    if let Some(&threads) = matches.get_one::<usize>("parallel") {
        builder = builder.parallel_threads(threads);
    }
    if let Some(output) = matches.get_one::<String>("output") {
        builder = builder.output_file(output.clone());
    }
    for file in matches.get_many::<String>("files").unwrap_or_default() {
        builder = builder.input_file(file.clone());
    }

    builder.build()
}

fn run_sort<W: Write>(config: &SortConfig, out: &mut W) -> SortResult<i32> {
    let inputs = config
        .inputs()
        .iter()
        .map(|name| ValueFile::open(name))
        .collect::<SortResult<Vec<_>>>()?;

    let driver = Driver::new(config.clone());
    let mut orders: Vec<Vec<u32>> = vec![Vec::new(); inputs.len()];

    if let [input] = inputs.as_slice() {
        if !input.is_empty() {
            let outcome = driver.sort_ids(input.count()?, |a, b| input.compare(a, b, config.mode))?;
            info!(file = input.name(), steps = outcome.steps, comparisons = outcome.comparisons, "sorted");
            orders[0] = outcome.state.arr;
        }
    } else {
        let jobs: Vec<usize> = (0..inputs.len()).filter(|&k| !inputs[k].is_empty()).collect();
        let counts = jobs
            .iter()
            .map(|&k| inputs[k].count())
            .collect::<SortResult<Vec<_>>>()?;
        let outcomes = driver.drive_many(&counts, |job, a, b| {
            inputs[jobs[job]].compare(a, b, config.mode)
        })?;
        for (&k, outcome) in jobs.iter().zip(outcomes) {
            let outcome = outcome?;
            info!(file = inputs[k].name(), steps = outcome.steps, comparisons = outcome.comparisons, "sorted");
            orders[k] = outcome.state.arr;
        }
    }

    let mut output: Box<dyn Write + '_> = match &config.output_file {
        Some(path) => Box::new(BufWriter::new(File::create(path).with_file_context(path)?)),
        None => Box::new(&mut *out),
    };
    let headers = inputs.len() > 1;
    for (k, (input, order)) in inputs.iter().zip(&orders).enumerate() {
        if headers {
            if k > 0 {
                writeln!(output)?;
            }
            writeln!(output, "==> {} <==", input.name())?;
        }
        for &id in order {
            output.write_all(input.get(id))?;
            output.write_all(b"\n")?;
        }
    }
    output.flush()?;

    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const EXAMPLE: [f64; 5] = [4.8, 10.0, 1.0, 2.5, 5.0];

    fn run(args: &[&str]) -> SortResult<String> {
        let matches = build_cli()
            .try_get_matches_from(args)
            .expect("Failed to parse test arguments");
        let mut out = Vec::new();
        dispatch(&matches, &mut out)?;
        Ok(String::from_utf8(out).expect("utf-8 output"))
    }

    #[test]
    fn test_parse_sort_config() {
        let matches = build_cli()
            .try_get_matches_from(["qsort-step", "sort", "-n", "-r", "--seed", "3", "values.txt"])
            .expect("Failed to parse test arguments");
        let (_, sub) = matches.subcommand().expect("subcommand");
        let config = parse_sort_config(sub).expect("Failed to parse test config");

        assert_eq!(config.mode, CompareMode::Numeric);
        assert!(config.reverse);
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.input_files, vec!["values.txt".to_string()]);
    }

    #[test]
    fn test_conflicting_options() {
        let matches = build_cli()
            .try_get_matches_from(["qsort-step", "sort", "-c", "state.bin", "a.txt", "b.txt"])
            .expect("Failed to parse test arguments");
        let (_, sub) = matches.subcommand().expect("subcommand");
        assert!(parse_sort_config(sub).is_err());
    }

    #[test]
    fn test_step_protocol_across_invocations() -> SortResult<()> {
        let temp_dir = TempDir::new()?;
        let state = temp_dir.path().join("state.bin").to_string_lossy().to_string();

        let init = run(&["qsort-step", "init", "-n", "5", &state])?;
        assert!(init.starts_with("initialized 5"));

        let mut line = run(&["qsort-step", "step", "--seed", "1", &state])?;
        let mut rounds = 0;
        while let Some(rest) = line.trim().strip_prefix("compare ") {
            let ids: Vec<usize> = rest
                .split(' ')
                .map(|id| id.parse().expect("element id"))
                .collect();
            let result = match EXAMPLE[ids[0]].total_cmp(&EXAMPLE[ids[1]]) {
                Ordering::Less => "less",
                Ordering::Greater => "greater",
                Ordering::Equal => "equal",
            };
            line = run(&["qsort-step", "step", "--seed", "1", "-r", result, &state])?;
            rounds += 1;
            assert!(rounds < 100);
        }

        assert_eq!(line.trim(), "sorted 2 3 0 4 1");
        let shown = run(&["qsort-step", "show", &state])?;
        assert!(shown.starts_with("phase: sorted"));
        Ok(())
    }

    #[test]
    fn test_step_without_answer_is_rejected() -> SortResult<()> {
        let temp_dir = TempDir::new()?;
        let state = temp_dir.path().join("state.bin").to_string_lossy().to_string();

        run(&["qsort-step", "init", "-n", "3", &state])?;
        run(&["qsort-step", "step", &state])?;
        let before = fs::read(&state)?;

        let err = run(&["qsort-step", "step", &state]).unwrap_err();
        assert!(err.is_protocol_violation());
        assert_eq!(fs::read(&state)?, before);
        Ok(())
    }

    #[test]
    fn test_init_rejects_zero_elements() -> SortResult<()> {
        let temp_dir = TempDir::new()?;
        let state = temp_dir.path().join("state.bin").to_string_lossy().to_string();
        assert!(run(&["qsort-step", "init", "-n", "0", &state]).is_err());
        assert!(!std::path::Path::new(&state).exists());
        Ok(())
    }

    #[test]
    fn test_sort_numeric_file() -> SortResult<()> {
        let temp_dir = TempDir::new()?;
        let input = temp_dir.path().join("values.txt");
        fs::write(&input, "4.8\n10.0\n1.0\n2.5\n5.0\n")?;
        let input = input.to_string_lossy().to_string();

        let output = run(&["qsort-step", "sort", "-n", "--seed", "2", &input])?;
        assert_eq!(output, "1.0\n2.5\n4.8\n5.0\n10.0\n");

        let output = run(&["qsort-step", "sort", "-r", &input])?;
        assert_eq!(output, "5.0\n4.8\n2.5\n10.0\n1.0\n");
        Ok(())
    }

    #[test]
    fn test_sort_with_checkpoint_and_output_file() -> SortResult<()> {
        let temp_dir = TempDir::new()?;
        let input = temp_dir.path().join("words.txt");
        let output = temp_dir.path().join("sorted.txt");
        let checkpoint = temp_dir.path().join("words.state");
        fs::write(&input, "zebra\napple\nbanana\ncherry\n")?;
        let (input_arg, output_arg, checkpoint_arg) = (
            input.to_string_lossy().to_string(),
            output.to_string_lossy().to_string(),
            checkpoint.to_string_lossy().to_string(),
        );

        run(&[
            "qsort-step",
            "sort",
            "--checkpoint",
            &checkpoint_arg,
            "--checkpoint-every",
            "2",
            "-o",
            &output_arg,
            &input_arg,
        ])?;

        assert_eq!(fs::read_to_string(&output)?, "apple\nbanana\ncherry\nzebra\n");
        assert!(codec::load(&checkpoint)?.sorted);
        Ok(())
    }

    #[test]
    fn test_sort_multiple_files() -> SortResult<()> {
        let temp_dir = TempDir::new()?;
        let a = temp_dir.path().join("a.txt");
        let b = temp_dir.path().join("b.txt");
        let empty = temp_dir.path().join("empty.txt");
        fs::write(&a, "3\n1\n2\n")?;
        fs::write(&b, "b\na\n")?;
        fs::write(&empty, "")?;
        let (a, b, empty) = (
            a.to_string_lossy().to_string(),
            b.to_string_lossy().to_string(),
            empty.to_string_lossy().to_string(),
        );

        let output = run(&["qsort-step", "sort", "--parallel", "2", &a, &empty, &b])?;
        assert_eq!(
            output,
            format!("==> {a} <==\n1\n2\n3\n\n==> {empty} <==\n\n==> {b} <==\na\nb\n")
        );
        Ok(())
    }
}
