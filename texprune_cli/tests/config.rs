mod common;

use predicates::prelude::PredicateBooleanExt;
use serde_json::Value;
use texprune_core::AnyEmptyResult;

#[test]
fn config_file_is_applied() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(
		tmp.path(),
		"src/texprune.toml",
		r#"out_root_doc_name = "submission"

[commands]
remove = ["todo"]
short_circuit = ["hl"]

[comments]
remove_completely = true
"#,
	)?;
	common::write(
		tmp.path(),
		"src/main.tex",
		"\\todo{later}\\hl{Bold} claim % citation needed\n",
	)?;
	let out = tmp.path().join("out");

	let mut cmd = common::texprune_cmd();
	cmd.arg(tmp.path().join("src/main.tex"))
		.arg(&out)
		.assert()
		.success()
		.stdout(predicates::str::contains("Config"))
		.stdout(predicates::str::contains("texprune.toml"));

	assert_eq!(
		std::fs::read_to_string(out.join("submission.tex"))?,
		"Bold claim \n"
	);
	assert!(!out.join("texprune.toml").exists());

	Ok(())
}

#[test]
fn config_file_is_not_reported_as_unused() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(tmp.path(), "src/texprune.toml", "[commands]\nremove = []\n")?;
	common::write(tmp.path(), "src/main.tex", "text\n")?;
	common::write(tmp.path(), "src/draft.tex", "old\n")?;

	let mut cmd = common::texprune_cmd();
	let output = cmd
		.arg(tmp.path().join("src/main.tex"))
		.arg(tmp.path().join("out"))
		.arg("--format=json")
		.output()?;

	assert!(output.status.success());
	let json: Value = serde_json::from_slice(&output.stdout)?;
	assert_eq!(json["unused_files"], serde_json::json!(["draft.tex"]));
	assert_eq!(json["files"][0]["path"], "texprune.toml");
	assert_eq!(json["files"][0]["file_type"], "ignore");

	Ok(())
}

#[test]
fn flags_extend_config_lists() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(
		tmp.path(),
		"src/texprune.toml",
		"[commands]\nremove = [\"todo\"]\n",
	)?;
	common::write(tmp.path(), "src/main.tex", "\\todo{a}\\note{b}\\keep{c}\n")?;
	let out = tmp.path().join("out");

	let mut cmd = common::texprune_cmd();
	cmd.arg(tmp.path().join("src/main.tex"))
		.arg(&out)
		.arg("--remove-cmd")
		.arg("note")
		.assert()
		.success();

	assert_eq!(std::fs::read_to_string(out.join("ms.tex"))?, "\\keep{c}\n");

	Ok(())
}

#[test]
fn flags_override_config_root_doc_name() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(
		tmp.path(),
		"src/texprune.toml",
		"out_root_doc_name = \"submission\"\n",
	)?;
	common::write(tmp.path(), "src/main.tex", "text\n")?;
	let out = tmp.path().join("out");

	let mut cmd = common::texprune_cmd();
	cmd.arg(tmp.path().join("src/main.tex"))
		.arg(&out)
		.arg("--out-root-doc-name")
		.arg("final")
		.assert()
		.success();

	assert!(out.join("final.tex").is_file());
	assert!(!out.join("submission.tex").exists());

	Ok(())
}

#[test]
fn config_exclude_hides_unused_files() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(
		tmp.path(),
		"src/texprune.toml",
		"[unused]\nexclude = [\"*.txt\"]\n",
	)?;
	common::write(tmp.path(), "src/main.tex", "text\n")?;
	common::write(tmp.path(), "src/notes.txt", "notes")?;
	common::write(tmp.path(), "src/draft.tex", "old\n")?;

	let mut cmd = common::texprune_cmd();
	cmd.arg(tmp.path().join("src/main.tex"))
		.arg(tmp.path().join("out"))
		.assert()
		.success()
		.stdout(predicates::str::contains("draft.tex"))
		.stdout(predicates::str::contains("notes.txt").not());

	Ok(())
}

#[test]
fn invalid_config_fails() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write(tmp.path(), "src/texprune.toml", "[commands\nremove = 1\n")?;
	common::write(tmp.path(), "src/main.tex", "text\n")?;

	let mut cmd = common::texprune_cmd();
	cmd.arg(tmp.path().join("src/main.tex"))
		.arg(tmp.path().join("out"))
		.assert()
		.code(2)
		.stderr(predicates::str::contains("failed to parse config file"));

	Ok(())
}
