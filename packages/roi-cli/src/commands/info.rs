use crate::cli::InfoArgs;
use crate::exit_codes;
use crate::output;
use roi_rs::runner::{
    find_tool, ANTSPATH_ENV_VAR, DEFAULT_TOOL_PATHS, LABEL_INTERPOLATION, TOOL_ENV_VAR, TOOL_NAME,
};
use serde::Serialize;

#[derive(Serialize)]
struct InfoOutput {
    cli_version: String,
    tool_name: &'static str,
    tool_path: Option<String>,
    tool_found: bool,
    interpolation: &'static str,
    platform: String,
    arch: String,
    search_paths: Vec<&'static str>,
}

pub fn execute(args: InfoArgs) -> i32 {
    let tool_path = find_tool(args.ants.as_deref());

    let info = InfoOutput {
        cli_version: env!("CARGO_PKG_VERSION").to_string(),
        tool_name: TOOL_NAME,
        tool_path: tool_path.as_ref().map(|p| p.display().to_string()),
        tool_found: tool_path.is_some(),
        interpolation: LABEL_INTERPOLATION,
        platform: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        search_paths: DEFAULT_TOOL_PATHS.to_vec(),
    };

    if args.json {
        if let Err(e) = output::print_json(&info) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    } else {
        println!("roits CLI v{}", info.cli_version);
        println!("Platform: {} ({})", info.platform, info.arch);
        println!();
        match &info.tool_path {
            Some(path) => println!("Registration tool: {}", path),
            None => println!("Registration tool: not found (resampling only)"),
        }
        println!("Tool name: {}", info.tool_name);
        println!("Label interpolation: {}", info.interpolation);
        println!(
            "Search paths: ${}, ${}, $PATH, {}",
            TOOL_ENV_VAR,
            ANTSPATH_ENV_VAR,
            info.search_paths.join(", ")
        );
    }

    exit_codes::SUCCESS
}
