mod common;

use std::path::Path;

use common::TEMPLATE_CONFIG;
use common::scaffold_cmd;
use predicates::str::contains;
use rstest::rstest;
use scaffold_core::AnyEmptyResult;
use similar_asserts::assert_eq;

fn write_config(dir: &Path) -> std::io::Result<std::path::PathBuf> {
	let path = dir.join("template.json");
	std::fs::write(&path, TEMPLATE_CONFIG)?;
	Ok(path)
}

#[test]
fn process_writes_output_file() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let config = write_config(tmp.path())?;
	let input = tmp.path().join("input.txt");
	let output = tmp.path().join("output.txt");
	std::fs::write(&input, "Hello %NAME%!\n#if A\nyes\n#else\nno\n#endif\n")?;

	scaffold_cmd()
		.arg("process")
		.arg("--config")
		.arg(&config)
		.arg(&input)
		.arg("--output")
		.arg(&output)
		.assert()
		.success()
		.stdout(contains("updated"));

	assert_eq!(std::fs::read_to_string(&output)?, "Hello Acme!\nyes\n");

	Ok(())
}

#[test]
fn process_prints_to_stdout_without_output() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let config = write_config(tmp.path())?;
	let input = tmp.path().join("input.txt");
	std::fs::write(&input, "#if A\n%NAME%\n#endif\n")?;

	scaffold_cmd()
		.arg("process")
		.arg("-c")
		.arg(&config)
		.arg(&input)
		.assert()
		.success()
		.stdout("Acme\n");

	Ok(())
}

#[test]
fn process_reads_stdin() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let config = write_config(tmp.path())?;

	scaffold_cmd()
		.arg("process")
		.arg("-c")
		.arg(&config)
		.arg("-")
		.write_stdin("from stdin: %NAME%")
		.assert()
		.success()
		.stdout("from stdin: Acme");

	Ok(())
}

#[rstest]
#[case::variable_false(&["--var", "A=false"], "no\n")]
#[case::variable_string(&["--var", "A=\"\""], "no\n")]
#[case::flag_disables_replacement(&["--flag", "names=false"], "%NAME%\n")]
fn process_applies_command_line_state(#[case] extra: &[&str], #[case] expected: &str) -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let config = write_config(tmp.path())?;
	let input = tmp.path().join("input.txt");
	std::fs::write(&input, "#if A\n%NAME%\n#else\nno\n#endif\n")?;

	scaffold_cmd()
		.arg("process")
		.arg("-c")
		.arg(&config)
		.arg(&input)
		.args(extra)
		.assert()
		.success()
		.stdout(expected.to_string());

	Ok(())
}

#[test]
fn process_resolves_includes_next_to_input() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let config = write_config(tmp.path())?;
	let input = tmp.path().join("input.txt");
	std::fs::write(tmp.path().join("part.txt"), "included")?;
	std::fs::write(&input, "[#include \"part.txt\"]")?;

	scaffold_cmd()
		.arg("process")
		.arg("-c")
		.arg(&config)
		.arg(&input)
		.assert()
		.success()
		.stdout("[included]");

	Ok(())
}

#[test]
fn process_prints_report() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let config = write_config(tmp.path())?;
	let input = tmp.path().join("input.txt");
	let output = tmp.path().join("output.txt");
	std::fs::write(&input, "%NAME% @@mark@@")?;

	let assert = scaffold_cmd()
		.arg("process")
		.arg("-c")
		.arg(&config)
		.arg(&input)
		.arg("-o")
		.arg(&output)
		.arg("--report")
		.assert()
		.success();

	let stdout = String::from_utf8(assert.get_output().stdout.clone())?;
	let json_start = stdout.find('{').unwrap_or_else(|| panic!("no report in {stdout:?}"));
	let report: serde_json::Value = serde_json::from_str(&stdout[json_start..])?;

	assert_eq!(
		report,
		serde_json::json!({
			"modified": true,
			"encoding": "utf-8",
			"tracked": [
				{ "token": "@@mark@@", "source_offset": 7, "target_offset": 5 }
			]
		})
	);

	Ok(())
}

#[test]
fn process_rewrites_input_in_place() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let config = write_config(tmp.path())?;
	let input = tmp.path().join("input.txt");
	std::fs::write(&input, "Hello %NAME%!")?;

	scaffold_cmd()
		.arg("process")
		.arg("-c")
		.arg(&config)
		.arg(&input)
		.arg("-o")
		.arg(&input)
		.assert()
		.success()
		.stdout(contains("updated"));

	assert_eq!(std::fs::read_to_string(&input)?, "Hello Acme!");

	Ok(())
}

#[test]
fn process_reports_content_errors() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let config = write_config(tmp.path())?;
	let input = tmp.path().join("input.txt");
	std::fs::write(&input, "ok\n#if (A\nbody\n#endif\n")?;

	scaffold_cmd()
		.arg("process")
		.arg("-c")
		.arg(&config)
		.arg(&input)
		.assert()
		.code(2)
		.stderr(contains("failed to generate content"))
		.stderr(contains("scaffold::content_generation"));

	Ok(())
}

#[test]
fn process_reports_invalid_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let config = tmp.path().join("template.json");
	std::fs::write(&config, r#"{ "operations": [{ "type": "teleport" }] }"#)?;

	scaffold_cmd()
		.arg("process")
		.arg("-c")
		.arg(&config)
		.write_stdin("")
		.assert()
		.code(2)
		.stderr(contains("failed to parse operation configuration"));

	Ok(())
}

#[test]
fn process_rejects_malformed_flags() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let config = write_config(tmp.path())?;

	scaffold_cmd()
		.arg("process")
		.arg("-c")
		.arg(&config)
		.arg("--flag")
		.arg("names")
		.assert()
		.failure()
		.stderr(contains("expected `name=value`"));

	Ok(())
}

#[test]
fn missing_subcommand_fails() {
	scaffold_cmd()
		.assert()
		.code(1)
		.stderr(contains("No subcommand specified"));
}

#[rstest]
#[case::bool_flag("debug=true", ("debug", true))]
#[case::trimmed(" debug = false ", ("debug", false))]
fn parses_flags(#[case] input: &str, #[case] expected: (&str, bool)) {
	let (name, value) = scaffold_cli::parse_flag(input).unwrap_or_else(|e| panic!("{e}"));
	assert_eq!((name.as_str(), value), expected);
}

#[rstest]
#[case::number("count=3", serde_json::json!(3))]
#[case::boolean("A=true", serde_json::json!(true))]
#[case::quoted("framework=\"net8.0\"", serde_json::json!("net8.0"))]
#[case::bare_string("framework=net8.0", serde_json::json!("net8.0"))]
fn parses_variables(#[case] input: &str, #[case] expected: serde_json::Value) {
	let (_, value) = scaffold_cli::parse_variable(input).unwrap_or_else(|e| panic!("{e}"));
	assert_eq!(value, expected);
}

#[rstest]
#[case::missing_equals("debug")]
#[case::missing_name("=true")]
#[case::not_a_bool("debug=maybe")]
fn rejects_malformed_flags(#[case] input: &str) {
	assert!(scaffold_cli::parse_flag(input).is_err());
}
