use assert_cmd::Command;
use insta_cmd::get_cargo_bin;

pub fn scaffold_cmd() -> Command {
	let mut cmd = Command::new(get_cargo_bin("scaffold"));
	cmd.env("NO_COLOR", "1");
	cmd.env_remove("RUST_LOG");
	cmd
}

pub const TEMPLATE_CONFIG: &str = r##"{
	"operations": [
		{ "type": "replacement", "id": "names", "token": "%NAME%", "replacement": "Acme" },
		{ "type": "conditional", "if": ["#if"], "elseif": ["#elseif"], "else": ["#else"], "endif": ["#endif"] },
		{ "type": "include", "start": "#include \"", "end": "\"" },
		{ "type": "position_tracker", "tokens": ["@@mark@@"] }
	],
	"variables": { "A": true }
}"##;
