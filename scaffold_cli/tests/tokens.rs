mod common;

use common::TEMPLATE_CONFIG;
use common::scaffold_cmd;
use scaffold_core::AnyEmptyResult;
use similar_asserts::assert_eq;

#[test]
fn tokens_lists_every_watched_token() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let config = tmp.path().join("template.json");
	std::fs::write(&config, TEMPLATE_CONFIG)?;

	let assert = scaffold_cmd()
		.arg("tokens")
		.arg("-c")
		.arg(&config)
		.assert()
		.success();
	let stdout = String::from_utf8(assert.get_output().stdout.clone())?;

	insta::assert_snapshot!(stdout, @r#"
	names                %NAME%
	conditional          #if
	conditional          #elseif
	conditional          #else
	conditional          #endif
	include              #include "
	position_tracker     @@mark@@
	"#);

	Ok(())
}

#[test]
fn tokens_as_json() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let config = tmp.path().join("template.json");
	std::fs::write(
		&config,
		r#"{ "operations": [{ "type": "region", "start": "<<", "end": ">>" }] }"#,
	)?;

	let assert = scaffold_cmd()
		.arg("tokens")
		.arg("-c")
		.arg(&config)
		.arg("--format")
		.arg("json")
		.assert()
		.success();
	let tokens: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout)?;

	assert_eq!(
		tokens,
		serde_json::json!([
			{ "operation": "region", "token": "<<" },
			{ "operation": "region", "token": ">>" }
		])
	);

	Ok(())
}

#[test]
fn tokens_with_empty_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let config = tmp.path().join("template.json");
	std::fs::write(&config, "{}")?;

	scaffold_cmd()
		.arg("tokens")
		.arg("-c")
		.arg(&config)
		.assert()
		.success()
		.stdout("No tokens configured.\n");

	Ok(())
}
