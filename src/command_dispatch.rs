//! Purpose: Hold top-level CLI command dispatch for `picklebox`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Each command writes one JSON document (or one payload line) to stdout.
//! Invariants: Helpers in `main.rs` remain the source of formatting logic.

use super::*;
use picklebox::api::{
    DecodeOptions, FunctionFixture, decode_with, encode_with, ensure_fixture, to_json,
};
use picklebox::builtins::{builtin_functions, perimeter_fixture};

pub(super) fn dispatch_command(command: Command, color_mode: ColorMode) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "picklebox", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Version => {
            emit_json(
                json!({
                    "name": "picklebox",
                    "version": env!("CARGO_PKG_VERSION"),
                }),
                color_mode,
            );
            Ok(RunOutcome::ok())
        }
        Command::Decode { input, with_source } => {
            let text = read_input(input.as_deref())?;
            let decode_options = DecodeOptions::new().encode_function_itself(with_source);
            let node = decode_with(text.trim(), &decode_options)?;
            let encode_options = EncodeOptions::new().encode_function_itself(
                with_source && node.as_function().is_some_and(|f| f.source().is_some()),
            );
            emit_json(describe_value(&node, &encode_options)?, color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Reencode {
            input,
            drop_nulls,
            with_source,
        } => {
            let text = read_input(input.as_deref())?;
            let decode_options = DecodeOptions::new().encode_function_itself(with_source);
            let node = decode_with(text.trim(), &decode_options)?;
            let encode_options = EncodeOptions::new()
                .include_null_fields(!drop_nulls)
                .encode_function_itself(with_source);
            println!("{}", encode_with(&node, &encode_options)?);
            Ok(RunOutcome::ok())
        }
        Command::Fixture { path } => {
            let file = ensure_fixture(&path, &perimeter_fixture())?;
            let fixture = FunctionFixture::parse(&file.contents)
                .map_err(|err| err.with_path(&file.path))?;
            emit_json(
                json!({
                    "path": file.path.display().to_string(),
                    "created": file.created,
                    "function": fixture.function,
                    "digest": picklebox::api::source_digest(&fixture.code),
                }),
                color_mode,
            );
            Ok(RunOutcome::ok())
        }
        Command::Call { input, args } => {
            let text = read_input(Some(input.as_path()))?;
            let decode_options = DecodeOptions::new().encode_function_itself(true);
            let node = decode_with(text.trim(), &decode_options)?;
            let registry = builtin_functions();
            let def = registry.materialize_node(&node)?;
            let args = args
                .iter()
                .map(|raw| parse_call_arg(raw))
                .collect::<Result<Vec<_>, _>>()?;
            let result = def.call(&args)?;
            let encode_options = EncodeOptions::new();
            let args_json = args
                .iter()
                .map(|arg| to_json(arg, &encode_options))
                .collect::<Result<Vec<_>, _>>()?;
            emit_json(
                json!({
                    "function": def.qualname(),
                    "args": args_json,
                    "result": to_json(&result, &encode_options)?,
                }),
                color_mode,
            );
            Ok(RunOutcome::ok())
        }
        Command::Functions => {
            let functions = builtin_functions()
                .iter()
                .map(|def| {
                    json!({
                        "name": def.name(),
                        "qualname": def.qualname(),
                        "params": def.params(),
                        "digest": def.digest(),
                        "source": def.source(),
                    })
                })
                .collect::<Vec<_>>();
            emit_json(json!({ "functions": functions }), color_mode);
            Ok(RunOutcome::ok())
        }
    }
}
