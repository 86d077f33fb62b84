//! End-to-end rendering scenarios, through the library API and through the
//! `htt` binary.

use std::process::Command;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use regex::Regex;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use htt::template::Severity;
use htt::{OutputMode, SortMode, SortOrder, Template};

#[ctor::ctor]
fn init_tests() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn people() -> Template {
    let mut t = Template::new();
    t.table("people", ["name", "age"]);
    t.set_row("people", ["carol", "10"]);
    t.set_row("people", ["alice", "2"]);
    t.set_row("people", ["bob", "30"]);
    t
}

fn render(t: &mut Template, src: &str) -> String {
    t.set_source(src);
    t.render()
}

// ── Library ───────────────────────────────────────────────────────────────────

#[test]
fn page_with_list_and_conditionals() {
    let mut t = people();
    t.set("title", "Members");
    t.set("show_ages", "1");
    let src = "\
<h1>{{$title}}</h1>
<ul>
{{#FOR $people}}  <li class=\"{{#IF %CURSOR==1}}first{{#ELSE}}rest{{#ENDIF}}\">{{.$name}}{{#IF $show_ages}} ({{.$age}}){{#ENDIF}}</li>
{{#ENDFOR}}</ul>
{{#IF 1}}<p>{{%ROWS@people}} members</p>{{#ENDIF}}";
    let expected = "\
<h1>Members</h1>
<ul>
  <li class=\"first\">carol (10)</li>
  <li class=\"rest\">alice (2)</li>
  <li class=\"rest\">bob (30)</li>
</ul>
<p>3 members</p>";
    assert_eq!(render(&mut t, src), expected);
    assert!(t.take_diagnostics().is_empty());
}

#[test]
fn for_over_three_rows_counts_cursor() {
    let mut t = people();
    let out = render(&mut t, "{{#FOR people}}{{%CURSOR}}/{{%ROWS}} {{#ENDFOR}}");
    assert_eq!(out, "1/3 2/3 3/3 ");
}

#[test]
fn sort_then_render() {
    let mut t = people();
    let src = "{{#FOR people}}{{.$age}} {{#ENDFOR}}";

    t.sort_table("people", "age", SortOrder::Ascending, SortMode::Integer);
    assert_eq!(render(&mut t, src), "2 10 30 ");

    t.sort_table("people", "age", SortOrder::Descending, SortMode::Integer);
    assert_eq!(render(&mut t, src), "30 10 2 ");

    t.sort_table("people", "age", SortOrder::Ascending, SortMode::Lexicographic);
    assert_eq!(render(&mut t, src), "10 2 30 ");

    t.sort_table("people", "name", SortOrder::Descending, SortMode::Lexicographic);
    assert_eq!(render(&mut t, "{{#FOR people}}{{.$name}} {{#ENDFOR}}"), "carol bob alice ");
}

#[test]
fn cell_and_row_edits() {
    let mut t = people();
    t.set_cell("people", 1, "name", "alicia");
    t.unset_row("people", 0);
    assert_eq!(render(&mut t, "{{#FOR people}}{{.$name}},{{#ENDFOR}}"), "alicia,bob,");
    assert!(t.unset_table("people"));
    assert_eq!(render(&mut t, "{{#FOR people}}x{{#ENDFOR}}"), "");
    let diags = t.take_diagnostics();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].severity, Severity::Warning);
}

#[test]
fn and_or_conditions() {
    let mut t = Template::new();
    t.set("a", "1");
    t.set("b", "2");
    assert_eq!(render(&mut t, "{{#IF AND($a==1, $b==2)}}both{{#ENDIF}}"), "both");
    assert_eq!(render(&mut t, "{{#IF AND($a==1, $b==3)}}both{{#ELSE}}no{{#ENDIF}}"), "no");
    assert_eq!(render(&mut t, "{{#IF OR($a==9, $b==2)}}one{{#ENDIF}}"), "one");
    assert!(t.take_diagnostics().is_empty());
}

#[test]
fn malformed_and_or_warns() {
    let mut t = Template::new();
    t.set("a", "1");
    render(&mut t, "{{#IF AND $a==1}}x{{#ENDIF}}");
    let diags = t.take_diagnostics();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].severity, Severity::Warning);
}

#[test]
fn directive_free_text_round_trips() {
    let mut t = Template::new();
    let src = "<html>\n  <body>{ not a tag } } {</body>\n</html>\n";
    assert_eq!(render(&mut t, src), src);
}

#[test]
fn unterminated_tag_rest_is_literal() {
    let mut t = Template::new();
    t.set("x", "X");
    assert_eq!(render(&mut t, "{{$x}} and {{$x"), "X and {{$x");
    let diags = t.take_diagnostics();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].severity, Severity::Error);
}

#[test]
fn stray_else_emits_nothing() {
    let mut t = Template::new();
    assert_eq!(render(&mut t, "a{{#ELSE}}b{{#ENDFOR}}c"), "abc");
    assert_eq!(t.take_diagnostics().len(), 2);
}

#[test]
fn row_count_outside_a_block_is_an_error() {
    let mut t = people();
    assert_eq!(render(&mut t, "<p>{{%ROWS@people}} members</p>"), "<p> members</p>");
    let diags = t.take_diagnostics();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].severity, Severity::Error);
    assert_eq!(diags[0].message, "unexpected {{%ROWS@people}}");
}

#[test]
fn open_loop_emits_tail_once() {
    let mut t = people();
    assert_eq!(render(&mut t, "{{#FOR people}}{{.$name}};"), "carol;");
    assert_eq!(t.take_diagnostics().len(), 1);
}

#[test]
fn css_braces_survive() {
    let mut t = Template::new();
    t.set("c", "red");
    let out = render(&mut t, "<style>p {{ color: {{$c}}; }}</style>");
    assert_eq!(out, "<style>p {{ color: red; }}</style>");
    assert_eq!(t.take_diagnostics().len(), 1);
}

#[test]
fn nested_loop_sees_outer_row() {
    let mut t = people();
    t.table("tags", ["tag"]);
    t.set_row("tags", ["a"]);
    t.set_row("tags", ["b"]);
    let out = render(
        &mut t,
        "{{#FOR people}}{{#IF .$age>5}}{{#FOR tags}}{{.$name@people}}-{{.$tag}} {{#ENDFOR}}{{#ENDIF}}{{#ENDFOR}}",
    );
    assert_eq!(out, "carol-a carol-b bob-a bob-b ");
}

#[test]
fn date_and_time_shape() {
    let mut t = Template::new();
    let out = render(&mut t, "{{%DATE}} {{%TIME}}");
    let re = Regex::new(r"^\d{4}-\d{1,2}-\d{1,2} \d{1,2}:\d{1,2}:\d{1,2}$").unwrap();
    assert!(re.is_match(&out), "{out}");
}

#[test]
fn debug_trailer_lists_tables_and_errors() {
    let mut t = people();
    t.set_clock(Some(NaiveDate::from_ymd_opt(2025, 12, 1).unwrap().and_hms_opt(23, 0, 9).unwrap()));
    t.set_source("line one\n{{#FOR ghost}}{{#ENDFOR}}\n{{bogus}}\n");
    t.set_mode(OutputMode::Debug);
    let html = t.html();
    let expected = "\
line one

{{bogus}}

<!-- Generated by htt 2025-12-1 23:0:9
  Template source: read from string
  Tables: 1
    Table people\t\t3 rows
  Errors: 2
    Line 2\t\tWarning: table ghost \"ghost\" is not defined or has no rows
    Line 3\t\tWarning: unknown directive \"{{bogus}}\"
-->";
    assert_eq!(html, expected);
}

// ── CLI ───────────────────────────────────────────────────────────────────────

fn htt() -> Command {
    Command::new(env!("CARGO_BIN_EXE_htt"))
}

#[test]
fn cli_renders_with_data_and_defines() {
    let dir = tempfile::tempdir().unwrap();
    let tmpl = dir.path().join("page.html");
    let data = dir.path().join("site.dat");
    std::fs::write(&tmpl, "{{$title}}:{{#FOR $langs}}{{.$code}}{{#ENDFOR}}").unwrap();
    std::fs::write(
        &data,
        "; site data\n/set title=Old\n/table langs code\n/row langs fr\n/row langs en\n/sort langs code\n",
    )
    .unwrap();

    let out = htt()
        .arg("-b")
        .arg(&data)
        .args(["-D", "title=New"])
        .arg(&tmpl)
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(String::from_utf8(out.stdout).unwrap(), "New:enfr");
}

#[test]
fn cli_writes_output_file_with_trailer() {
    let dir = tempfile::tempdir().unwrap();
    let tmpl = dir.path().join("page.html");
    let dest = dir.path().join("out.html");
    std::fs::write(&tmpl, "hi").unwrap();

    let status = htt().arg("-d").arg("-o").arg(&dest).arg(&tmpl).status().unwrap();
    assert!(status.success());
    let written = std::fs::read_to_string(&dest).unwrap();
    assert!(written.starts_with("hi\n<!-- Generated by htt "), "{written}");
    assert!(written.contains(&format!("Template source: {}", tmpl.display())));
}

#[test]
fn cli_missing_template_fails() {
    let out = htt().arg("/nonexistent/page.html").output().unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("can't open template"));
}

#[test]
fn cli_reports_bad_data_lines() {
    let dir = tempfile::tempdir().unwrap();
    let tmpl = dir.path().join("t.html");
    let data = dir.path().join("d.dat");
    std::fs::write(&tmpl, "ok").unwrap();
    std::fs::write(&data, "/frobnicate\n").unwrap();

    let out = htt().arg("-b").arg(&data).arg(&tmpl).output().unwrap();
    assert!(out.status.success());
    assert_eq!(String::from_utf8(out.stdout).unwrap(), "ok");
    assert!(String::from_utf8_lossy(&out.stderr).contains("line 1: unknown directive /frobnicate"));
}
