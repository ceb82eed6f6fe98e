// Vigna Testbench - Bare-metal fixtures and simulator for the Vigna RISC-V core
// Copyright (C) 2026 Vigna Testbench Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

mod report;
mod setup;

use anyhow::{anyhow, bail, Context};
use clap::{ArgGroup, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use vigna_config::{
    CoreConfig, Preset, StopReason, TestAssertion, TestLimits, TestScript, DEFAULT_CORE,
    DEFAULT_MEMORY_SIZE, OPTIONS, PRESETS,
};
use vigna_core::memory::ProgramImage;
use vigna_core::metrics::PerformanceMetrics;
use vigna_core::peripherals::OutputWrite;
use vigna_core::verify::{self, Expectation};
use vigna_core::{Machine, RunLimits, RunOutcome};
use vigna_harness::fixture::{self, Fixture};

use report::{AssertionResult, Status, TestConfig, TestResult, ViolationRecord};

const EXIT_PASS: u8 = 0;
const EXIT_ASSERT_FAIL: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

const DEFAULT_MAX_STEPS: u64 = 1_000_000;
const DEFAULT_CONF_OUTPUT: &str = "vigna_conf_generated.vh";

fn parse_u32_addr(s: &str) -> Result<u32, String> {
    let trimmed = s.trim();
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex address '{}': {}", s, e))
    } else {
        u32::from_str(trimmed).map_err(|e| format!("Invalid address '{}': {}", s, e))
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("Expected OPTION=VALUE, got '{}'", s)),
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Vigna bare-metal test bench", long_about = None)]
struct Cli {
    /// Enable instruction-level execution tracing
    #[arg(short, long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a firmware image until the core parks itself.
    Run(RunArgs),

    /// Run a fixture program and check its output region.
    Verify(VerifyArgs),

    /// Deterministic, CI-friendly runner mode driven by a test script (YAML).
    Test(TestArgs),

    /// Generate, inspect or validate a vigna_conf.vh core configuration.
    Config(ConfigArgs),

    /// Export a memory image for Verilog $readmemh.
    Image(ImageArgs),
}

#[derive(Parser, Debug)]
struct CoreArgs {
    /// Core preset name or path to a vigna_conf.vh header
    #[arg(long, default_value = DEFAULT_CORE)]
    core: String,

    /// Size of the simulated memory (e.g. 64KiB)
    #[arg(long, default_value = DEFAULT_MEMORY_SIZE)]
    memory_size: String,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Path to the firmware ELF file
    #[arg(short, long)]
    firmware: PathBuf,

    #[command(flatten)]
    core: CoreArgs,

    /// Maximum number of steps to execute
    #[arg(long, default_value_t = DEFAULT_MAX_STEPS)]
    max_steps: u64,

    /// Stop after this much host time
    #[arg(long)]
    wall_time_ms: Option<u64>,

    /// Write a machine snapshot (JSON) after the run
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct VerifyArgs {
    /// Path to the firmware ELF file
    #[arg(short, long)]
    firmware: PathBuf,

    /// Fixture to check against (defaults to the firmware file name)
    #[arg(long)]
    fixture: Option<String>,

    /// Repeat the run on fresh machines and require identical results
    #[arg(long, default_value_t = 1)]
    runs: u32,

    #[command(flatten)]
    core: CoreArgs,

    /// Maximum number of steps per run
    #[arg(long, default_value_t = DEFAULT_MAX_STEPS)]
    max_steps: u64,
}

#[derive(Parser, Debug)]
struct TestArgs {
    /// Path to the firmware ELF file (overrides the script)
    #[arg(short = 'f', long)]
    firmware: Option<PathBuf>,

    /// Path to the test script (YAML)
    #[arg(short = 'c', long)]
    script: PathBuf,

    /// Core preset or vigna_conf.vh path (overrides the script)
    #[arg(long)]
    core: Option<String>,

    /// Override max steps (takes precedence over script)
    #[arg(long)]
    max_steps: Option<u64>,

    /// Directory to write test artifacts (result.json, snapshot.json, junit.xml)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Optional path to write a JUnit XML report for CI systems
    #[arg(long)]
    junit: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ConfigArgs {
    /// List presets and options
    #[arg(long)]
    list: bool,

    /// Start from a predefined configuration
    #[arg(long, alias = "config")]
    preset: Option<String>,

    /// Start from an existing vigna_conf.vh
    #[arg(long)]
    parse: Option<PathBuf>,

    /// Enable a flag option (repeatable)
    #[arg(long, value_name = "OPTION")]
    enable: Vec<String>,

    /// Disable a flag option (repeatable)
    #[arg(long, value_name = "OPTION")]
    disable: Vec<String>,

    /// Set a value option (repeatable)
    #[arg(long, value_name = "OPTION=VALUE", value_parser = parse_key_value)]
    set: Vec<(String, String)>,

    /// Only check dependencies and conflicts, write nothing
    #[arg(long)]
    validate: bool,

    /// Output header path, '-' for stdout
    #[arg(short, long, default_value = DEFAULT_CONF_OUTPUT)]
    output: PathBuf,
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["firmware", "objdump"])))]
struct ImageArgs {
    /// Firmware ELF to export
    #[arg(short, long)]
    firmware: Option<PathBuf>,

    /// objdump -d listing to export
    #[arg(long)]
    objdump: Option<PathBuf>,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// First address of the exported window
    #[arg(long, value_parser = parse_u32_addr, default_value = "0")]
    base: u32,

    /// Window size (e.g. 4KiB); zero-padded or truncated to fit
    #[arg(long)]
    size: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing with appropriate level based on --trace flag.
    // Logs go to stderr so generated headers and images can be piped.
    if cli.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Run(args) => run_run(args),
        Commands::Verify(args) => run_verify(args),
        Commands::Test(args) => run_test(args),
        Commands::Config(args) => run_config(args),
        Commands::Image(args) => run_image(args),
    }
}

fn run_limits(max_steps: u64, wall_time_ms: Option<u64>) -> RunLimits {
    RunLimits {
        max_steps,
        wall_time: wall_time_ms.map(Duration::from_millis),
    }
}

fn output_writes(machine: &Machine<vigna_core::cpu::RiscV>) -> Vec<OutputWrite> {
    machine
        .bus
        .output()
        .map(|port| port.writes().to_vec())
        .unwrap_or_default()
}

fn report_metrics(outcome: &RunOutcome, metrics: &PerformanceMetrics) {
    info!("Simulation loop finished: {}", outcome.stop_reason);
    info!("Final PC: {:#x}", outcome.pc);
    info!("Total Instructions: {}", metrics.get_instructions());
    info!("Store Instructions: {}", metrics.get_stores());
    info!("Average IPS: {:.2}", metrics.get_ips());
}

fn run_run(args: RunArgs) -> ExitCode {
    info!("Loading firmware: {:?}", args.firmware);
    let mut booted = match setup::boot(&args.firmware, &args.core.core, &args.core.memory_size) {
        Ok(b) => b,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    let machine = &mut booted.machine;

    let metrics = Arc::new(PerformanceMetrics::new());
    machine.observers.push(metrics.clone());

    info!("Running for at most {} steps...", args.max_steps);
    let outcome = machine.run(&run_limits(args.max_steps, args.wall_time_ms));
    report_metrics(&outcome, &metrics);

    let base = machine.bus.output_base();
    let writes = output_writes(machine);
    let used = writes.iter().map(|w| w.cell + 1).max().unwrap_or(0);
    match machine.bus.output() {
        Some(port) if used > 0 => {
            for (cell, value) in port.cells()[..used].iter().enumerate() {
                println!(
                    "cell[{:2}] @ {:#06x} = {:#010x} ({})",
                    cell,
                    base + (cell * 4) as u64,
                    value,
                    *value as i32
                );
            }
        }
        _ => println!("no output written"),
    }
    println!(
        "stop_reason: {} after {} steps (pc={:#x})",
        outcome.stop_reason, outcome.steps, outcome.pc
    );

    if let Some(path) = &args.snapshot {
        let written = machine
            .snapshot()
            .to_json()
            .map_err(anyhow::Error::from)
            .and_then(|json| {
                std::fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))
            });
        match written {
            Ok(()) => info!("Wrote snapshot to {:?}", path),
            Err(e) => {
                error!("{:#}", e);
                return ExitCode::from(EXIT_RUNTIME_ERROR);
            }
        }
    }

    match &outcome.error {
        Some(e) => {
            error!("Run aborted: {}", e);
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
        None => ExitCode::from(EXIT_PASS),
    }
}

fn lookup_fixture(name: &str) -> anyhow::Result<&'static Fixture> {
    Fixture::lookup(name).ok_or_else(|| {
        let known: Vec<&str> = fixture::ALL.iter().map(|f| f.name).collect();
        anyhow!("Unknown fixture '{}' (known: {})", name, known.join(", "))
    })
}

fn run_verify(args: VerifyArgs) -> ExitCode {
    let name = match args.fixture.clone().or_else(|| {
        args.firmware
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
    }) {
        Some(n) => n,
        None => {
            error!("Cannot infer a fixture name from {:?}; pass --fixture", args.firmware);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    let fixture = match lookup_fixture(&name) {
        Ok(f) => f,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    let limits = RunLimits::steps(args.max_steps);

    let run_once = || -> anyhow::Result<(RunOutcome, Vec<OutputWrite>)> {
        let mut booted = setup::boot(&args.firmware, &args.core.core, &args.core.memory_size)?;
        let outcome = booted.machine.run(&limits);
        Ok((outcome, output_writes(&booted.machine)))
    };

    let (outcome, writes) = match run_once() {
        Ok(r) => r,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let mut diverged = Vec::new();
    for run in 2..=args.runs.max(1) {
        match run_once() {
            Ok((o, w)) if o == outcome && w == writes => {}
            Ok(_) => {
                warn!("Run {} diverged from run 1", run);
                diverged.push(run);
            }
            Err(e) => {
                error!("{:#}", e);
                return ExitCode::from(EXIT_CONFIG_ERROR);
            }
        }
    }

    let report = verify::check_run(&outcome, &writes, &Expectation::from(fixture));
    println!("{}: {}", fixture.name, report);
    if args.runs > 1 {
        if diverged.is_empty() {
            println!("identical across {} runs", args.runs);
        } else {
            println!("runs {:?} diverged from run 1", diverged);
        }
    }

    if let Some(e) = &outcome.error {
        error!("Run aborted: {}", e);
        ExitCode::from(EXIT_RUNTIME_ERROR)
    } else if !report.passed() || !diverged.is_empty() {
        ExitCode::from(EXIT_ASSERT_FAIL)
    } else {
        ExitCode::from(EXIT_PASS)
    }
}

fn resolve_script_path(script_path: &Path, value: &str) -> PathBuf {
    let p = PathBuf::from(value);
    if p.is_absolute() {
        return p;
    }
    script_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(p)
}

/// What an assertion compares once the run is over.
enum Check {
    Output(Expectation),
    StopReason(StopReason),
}

fn run_test(args: TestArgs) -> ExitCode {
    let started = Instant::now();
    let mut config = TestConfig {
        firmware: args.firmware.clone(),
        core: args.core.clone().unwrap_or_else(|| DEFAULT_CORE.to_string()),
        memory_size: DEFAULT_MEMORY_SIZE.to_string(),
        script: args.script.clone(),
    };
    let mut limits = TestLimits {
        max_steps: args.max_steps.unwrap_or(DEFAULT_MAX_STEPS),
        wall_time_ms: None,
    };

    let config_error = |msg: String, limits: TestLimits, config: TestConfig| -> ExitCode {
        error!("{}", msg);
        let result = TestResult::config_error(msg, limits, config);
        report::write_outputs(
            args.output_dir.as_deref(),
            args.junit.as_deref(),
            &result,
            None,
        );
        ExitCode::from(EXIT_CONFIG_ERROR)
    };

    let script = match TestScript::from_file(&args.script) {
        Ok(s) => s,
        Err(e) => return config_error(format!("{:#}", e), limits, config),
    };

    limits.max_steps = args.max_steps.unwrap_or(script.limits.max_steps);
    limits.wall_time_ms = script.limits.wall_time_ms;
    if limits.max_steps == 0 || limits.max_steps > vigna_config::script::MAX_ALLOWED_STEPS {
        let msg = format!(
            "max_steps {} is outside 1..={}",
            limits.max_steps,
            vigna_config::script::MAX_ALLOWED_STEPS
        );
        return config_error(msg, limits, config);
    }

    let firmware_path = args
        .firmware
        .clone()
        .unwrap_or_else(|| resolve_script_path(&args.script, &script.inputs.firmware));
    config.firmware = Some(firmware_path.clone());

    if args.core.is_none() {
        if let Some(core) = &script.inputs.core {
            config.core = if Preset::find(core).is_some() {
                core.clone()
            } else {
                resolve_script_path(&args.script, core)
                    .to_string_lossy()
                    .into_owned()
            };
        }
    }
    if let Some(size) = &script.inputs.memory_size {
        config.memory_size = size.clone();
    }

    let mut checks = Vec::with_capacity(script.assertions.len());
    for assertion in &script.assertions {
        let check = match assertion {
            TestAssertion::Fixture(a) => match lookup_fixture(&a.fixture) {
                Ok(f) => Check::Output(Expectation::from(f)),
                Err(e) => return config_error(format!("{:#}", e), limits, config),
            },
            TestAssertion::Output(a) => Check::Output(Expectation::from(&a.output)),
            TestAssertion::ExpectedStopReason(a) => Check::StopReason(a.expected_stop_reason),
        };
        checks.push((assertion.clone(), check));
    }

    let booted = match setup::boot(&firmware_path, &config.core, &config.memory_size) {
        Ok(b) => b,
        Err(e) => return config_error(format!("{:#}", e), limits, config),
    };
    let firmware_hash = setup::firmware_hash(&booted.firmware_bytes);
    let mut machine = booted.machine;

    let metrics = Arc::new(PerformanceMetrics::new());
    machine.observers.push(metrics.clone());

    info!("Running test script {:?}", args.script);
    let outcome = machine.run(&run_limits(limits.max_steps, limits.wall_time_ms));
    report_metrics(&outcome, &metrics);

    let writes = output_writes(&machine);
    let mut assertion_results = Vec::with_capacity(checks.len());
    let mut all_passed = true;
    let mut expected_stop_matched = false;

    for (assertion, check) in checks {
        let (passed, violations) = match &check {
            Check::Output(expectation) => {
                let report = verify::check_run(&outcome, &writes, expectation);
                let records: Vec<ViolationRecord> =
                    report.violations.iter().map(ViolationRecord::from).collect();
                (report.passed(), records)
            }
            Check::StopReason(expected) => {
                let passed = *expected == outcome.stop_reason;
                expected_stop_matched |= passed;
                (passed, Vec::new())
            }
        };

        if !passed {
            all_passed = false;
            error!(
                "Assertion failed: {}",
                report::assertion_short_name(&assertion)
            );
            for v in &violations {
                error!("  - {}", v.message);
            }
        }

        assertion_results.push(AssertionResult {
            assertion,
            passed,
            violations,
        });
    }

    let needs_assertion =
        report::stop_requires_assertion(outcome.stop_reason) && !expected_stop_matched;
    let sim_error = outcome.error.is_some();
    let status = if !all_passed || needs_assertion {
        Status::Fail
    } else if sim_error && !expected_stop_matched {
        Status::Error
    } else {
        Status::Pass
    };

    let snapshot = machine.snapshot();
    let result = TestResult {
        result_schema_version: report::RESULT_SCHEMA_VERSION.to_string(),
        status,
        steps_executed: outcome.steps,
        instructions: metrics.get_instructions(),
        stores: metrics.get_stores(),
        stop_reason: outcome.stop_reason,
        limits,
        message: outcome.error.as_ref().map(|e| e.to_string()),
        assertions: assertion_results,
        firmware_hash,
        output: Some(snapshot.output.clone()),
        config,
        duration: started.elapsed(),
    };
    report::write_outputs(
        args.output_dir.as_deref(),
        args.junit.as_deref(),
        &result,
        Some(&snapshot),
    );

    info!(
        "Test {}: {} after {} steps",
        status.as_str(),
        outcome.stop_reason,
        outcome.steps
    );
    match status {
        Status::Pass => ExitCode::from(EXIT_PASS),
        Status::Fail => ExitCode::from(EXIT_ASSERT_FAIL),
        Status::Error => ExitCode::from(EXIT_RUNTIME_ERROR),
    }
}

fn print_catalogue() {
    println!("Presets:");
    for preset in PRESETS.iter() {
        println!("  {:<16} {:<16} {}", preset.key, preset.name, preset.description);
    }

    let mut category = "";
    for option in OPTIONS.iter() {
        if option.category != category {
            category = option.category;
            println!();
            println!("{}:", category);
        }
        let mut line = format!("  {:<20} {}", option.key, option.description);
        if !option.default.is_empty() {
            line.push_str(&format!(" [default: {}]", option.default));
        }
        if let Some(dep) = option.depends_on {
            line.push_str(&format!(" (requires {})", dep));
        }
        println!("{}", line);
    }
}

fn build_config(args: &ConfigArgs) -> anyhow::Result<(CoreConfig, String)> {
    let mut config = CoreConfig::new();
    let mut title = "Custom Configuration".to_string();

    if let Some(key) = &args.preset {
        let preset = Preset::find(key).ok_or_else(|| {
            let known: Vec<&str> = PRESETS.iter().map(|p| p.key).collect();
            anyhow!("Unknown configuration '{}' (known: {})", key, known.join(", "))
        })?;
        info!("Using predefined configuration: {}", preset.name);
        config = CoreConfig::preset(key)?;
        title = preset.name.to_string();
    }
    if let Some(path) = &args.parse {
        info!("Parsing existing configuration {:?}", path);
        config.merge(&CoreConfig::from_file(path)?);
    }
    for key in &args.enable {
        config.enable(key)?;
    }
    for key in &args.disable {
        config.disable(key)?;
    }
    for (key, value) in &args.set {
        config.set_value(key, value)?;
    }
    Ok((config, title))
}

fn run_config(args: ConfigArgs) -> ExitCode {
    if args.list {
        print_catalogue();
        return ExitCode::from(EXIT_PASS);
    }

    let (config, title) = match build_config(&args) {
        Ok(c) => c,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    if let Err(errors) = config.validate() {
        eprintln!("Configuration validation failed:");
        for e in &errors {
            eprintln!("  - {}", e);
        }
        return ExitCode::from(EXIT_CONFIG_ERROR);
    }
    if args.validate {
        println!("Configuration is valid!");
        return ExitCode::from(EXIT_PASS);
    }

    let header = config.render(&title);
    if args.output.as_os_str() == "-" {
        print!("{}", header);
        return ExitCode::from(EXIT_PASS);
    }
    match std::fs::write(&args.output, header) {
        Ok(()) => {
            println!("Configuration file generated: {}", args.output.display());
            ExitCode::from(EXIT_PASS)
        }
        Err(e) => {
            error!("Failed to write {:?}: {}", args.output, e);
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
    }
}

fn objdump_text(listing: &Path, base: u64, size: Option<usize>) -> anyhow::Result<String> {
    let text = std::fs::read_to_string(listing)
        .with_context(|| format!("Failed to read objdump listing {:?}", listing))?;
    let words = vigna_loader::words_from_objdump(&text)?;
    if words.is_empty() {
        bail!("No instructions found in {:?}", listing);
    }
    match size {
        Some(size) => {
            let mut image = ProgramImage::new(base);
            image.add_segment(base, words.iter().flat_map(|w| w.to_le_bytes()).collect());
            Ok(vigna_loader::readmemh(&image, base, size))
        }
        None => Ok(vigna_loader::words_to_readmemh(&words)),
    }
}

fn image_text(args: &ImageArgs) -> anyhow::Result<String> {
    let base = args.base as u64;
    let size = args
        .size
        .as_deref()
        .map(setup::memory_bytes)
        .transpose()?;

    if let Some(listing) = &args.objdump {
        return objdump_text(listing, base, size);
    }
    let Some(elf) = &args.firmware else {
        bail!("Either --firmware or --objdump is required");
    };
    let image = vigna_loader::load_elf(elf)?;

    let len = match size {
        Some(size) => size,
        None => match image.extent() {
            Some((_, end)) if end > base => (end - base) as usize,
            _ => bail!("Image has no bytes at or above {:#x}", base),
        },
    };
    Ok(vigna_loader::readmemh(&image, base, len))
}

fn run_image(args: ImageArgs) -> ExitCode {
    let text = match image_text(&args) {
        Ok(t) => t,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    match &args.output {
        Some(path) => match std::fs::write(path, text) {
            Ok(()) => {
                info!("Wrote memory image to {:?}", path);
                ExitCode::from(EXIT_PASS)
            }
            Err(e) => {
                error!("Failed to write {:?}: {}", path, e);
                ExitCode::from(EXIT_RUNTIME_ERROR)
            }
        },
        None => {
            print!("{}", text);
            ExitCode::from(EXIT_PASS)
        }
    }
}
