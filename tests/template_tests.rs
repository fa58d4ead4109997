use posh_line::template::{Context, Globals, Renderer, Template, TemplateError};
use posh_line::utils::cache::{Caches, INFINITE};
use serde_json::{json, Value};
use tempfile::TempDir;

fn globals() -> Value {
    let mut globals = Globals {
        shell: "zsh".to_string(),
        user_name: "ada".to_string(),
        host_name: "engine".to_string(),
        code: 1,
        ..Globals::default()
    };
    globals
        .segments
        .insert("Git".to_string(), json!({ "HEAD": "main", "Dirty": true }));
    globals.to_value()
}

fn render(source: &str, data: &Value) -> Result<String, TemplateError> {
    let globals = globals();
    let ctx = Context::new(&globals).with_data(data);
    Renderer::new().render_str(source, &ctx)
}

#[test]
fn test_literal_text_renders_verbatim() {
    let data = json!({});
    for text in ["", "plain", "a { b } c", "100% done", "  spaced  ", "λ ❯"] {
        assert_eq!(render(text, &data).unwrap(), text);
    }

    let data = json!({ "Name": "x" });
    assert_eq!(render("before {{ .Name }} after", &data).unwrap(), "before x after");
}

#[test]
fn test_unguarded_missing_variable_is_incorrect() {
    let data = json!({ "Name": "x" });

    let err = render("{{ .Missing }}", &data).unwrap_err();
    assert!(matches!(err, TemplateError::IncorrectTemplate(_)));

    let err = render("{{ .Name.Deeper }}", &data).unwrap_err();
    assert!(matches!(err, TemplateError::IncorrectTemplate(_)));

    let err = render("{{ upper .Missing }}", &data).unwrap_err();
    assert!(matches!(err, TemplateError::IncorrectTemplate(_)));
}

#[test]
fn test_guarded_missing_variable_takes_else_branch() {
    let data = json!({ "Name": "x" });

    assert_eq!(render("{{ if .Missing }}yes{{ else }}no{{ end }}", &data).unwrap(), "no");
    assert_eq!(render("{{ if and .Missing .Missing.Deeper }}yes{{ else }}no{{ end }}", &data).unwrap(), "no");
    assert_eq!(render("{{ if not .Missing }}absent{{ end }}", &data).unwrap(), "absent");
    assert_eq!(render("{{ default \"none\" .Missing }}", &data).unwrap(), "none");
    assert_eq!(render("{{ default \"none\" .Name }}", &data).unwrap(), "x");
}

#[test]
fn test_syntax_errors_are_invalid() {
    let data = json!({});
    for source in [
        "{{ .Name",
        "stray }} brace",
        "{{ if .X }}open",
        "{{ end }}",
        "{{ else }}",
        "{{ frobnicate .X }}",
        "{{ }}",
    ] {
        let err = render(source, &data).unwrap_err();
        assert!(
            matches!(err, TemplateError::InvalidTemplate(_)),
            "{:?} should be invalid, got {:?}",
            source,
            err
        );
    }
}

#[test]
fn test_data_shadows_globals() {
    let data = json!({ "UserName": "segment" });
    assert_eq!(render("{{ .UserName }}", &data).unwrap(), "segment");
    assert_eq!(render("{{ .$.UserName }}", &data).unwrap(), "ada");
    assert_eq!(render("{{ .Data.UserName }}@{{ .HostName }}", &data).unwrap(), "segment@engine");
    assert_eq!(render("{{ .Segments.Git.HEAD }}", &data).unwrap(), "main");
}

#[test]
fn test_unset_environment_variables_read_as_empty() {
    let mut globals = Globals::default();
    globals.env.insert("HOME".to_string(), "/home/ada".to_string());
    let globals = globals.to_value();
    let data = json!({});
    let ctx = Context::new(&globals).with_data(&data);
    let renderer = Renderer::new();

    assert_eq!(renderer.render_str("{{ .Env.HOME }}", &ctx).unwrap(), "/home/ada");
    assert_eq!(renderer.render_str("[{{ .Env.UNSET }}]", &ctx).unwrap(), "[]");
    assert_eq!(renderer.render_str("[{{ .$.Env.UNSET }}]", &ctx).unwrap(), "[]");
    assert_eq!(
        renderer.render_str("{{ if .Env.UNSET }}set{{ else }}unset{{ end }}", &ctx).unwrap(),
        "unset"
    );
    assert!(matches!(
        renderer.render_str("{{ .Var.UNSET }}", &ctx),
        Err(TemplateError::IncorrectTemplate(_))
    ));
}

#[test]
fn test_conditionals_and_ranges() {
    let data = json!({ "Code": 2, "Items": ["a", "b", "c"], "Empty": [] });

    let source = "{{ if eq .Code 0 }}ok{{ else if gt .Code 1 }}bad{{ else }}meh{{ end }}";
    assert_eq!(render(source, &data).unwrap(), "bad");

    assert_eq!(render("{{ range .Items }}[{{ . }}]{{ end }}", &data).unwrap(), "[a][b][c]");
    assert_eq!(render("{{ range .Empty }}x{{ else }}none{{ end }}", &data).unwrap(), "none");
}

#[test]
fn test_pipelines_and_functions() {
    let data = json!({ "Name": "posh-line", "Path": "/home/ada/src", "Count": 7 });

    assert_eq!(render("{{ .Name | upper }}", &data).unwrap(), "POSH-LINE");
    assert_eq!(render("{{ .Name | trunc 4 }}", &data).unwrap(), "posh");
    assert_eq!(render("{{ trunc -4 .Name }}", &data).unwrap(), "line");
    assert_eq!(render("{{ base .Path }}/{{ dir .Path }}", &data).unwrap(), "src//home/ada");
    assert_eq!(render("{{ replace \"-\" \" \" .Name | title }}", &data).unwrap(), "Posh Line");
    assert_eq!(render("{{ add .Count 3 }} {{ div .Count 2 }} {{ mod .Count 4 }}", &data).unwrap(), "10 3 3");
    assert_eq!(render("{{ if contains \"line\" .Name }}yes{{ end }}", &data).unwrap(), "yes");
    assert_eq!(render("{{ len (upper .Name) }}", &data).unwrap(), "9");
}

#[test]
fn test_function_type_errors_are_incorrect() {
    let data = json!({ "Name": "x", "Count": 1 });

    for source in ["{{ upper .Count }}", "{{ div .Count 0 }}", "{{ upper .Name .Name }}", "{{ eq .Name .Count }}"] {
        let err = render(source, &data).unwrap_err();
        assert!(
            matches!(err, TemplateError::IncorrectTemplate(_)),
            "{:?} should fail evaluation, got {:?}",
            source,
            err
        );
    }
}

#[test]
fn test_whitespace_trimming_and_comments() {
    let data = json!({ "Name": "x" });
    assert_eq!(render("a   {{- .Name -}}   b", &data).unwrap(), "axb");
    assert_eq!(render("a{{/* note */}}b", &data).unwrap(), "ab");
}

#[test]
fn test_cache_function_reads_session_then_device() {
    let temp_dir = TempDir::new().unwrap();
    let caches = Caches::open_in(temp_dir.path(), "template-test");
    caches.device.set("greeting", "device", INFINITE);
    caches.device.set("shared", "device", INFINITE);
    caches.session.set("shared", "session", INFINITE);

    let globals = globals();
    let data = json!({});
    let ctx = Context::new(&globals).with_data(&data).with_cache(&caches);
    let renderer = Renderer::new();

    assert_eq!(renderer.render_str("{{ cache \"greeting\" }}", &ctx).unwrap(), "device");
    assert_eq!(renderer.render_str("{{ cache \"shared\" }}", &ctx).unwrap(), "session");
    assert_eq!(renderer.render_str("[{{ cache \"absent\" }}]", &ctx).unwrap(), "[]");
}

#[test]
fn test_parsed_templates_are_pooled() {
    let globals = globals();
    let data = json!({ "Name": "x" });
    let ctx = Context::new(&globals).with_data(&data);
    let renderer = Renderer::new();

    for _ in 0..3 {
        renderer.render_str("{{ .Name }}", &ctx).unwrap();
    }
    renderer.render_str("literal", &ctx).unwrap();
    assert!(renderer.render_str("{{ .Name", &ctx).is_err());

    assert_eq!(renderer.pooled(), 1);
    assert!(Template::new("plain").is_literal());
    assert!(!Template::new("{{ .Name }}").is_literal());
}
