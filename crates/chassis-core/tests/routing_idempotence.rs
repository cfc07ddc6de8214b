//! Integration tests for routing config regeneration.

use chassis_core::routing::chassis_default_rules;
use chassis_core::{
    BuildConfig, EndpointRegistry, EnvironmentKind, ServiceEndpoint, StructuredGenerator,
    TemplateGenerator,
};

const SCENARIO_TEMPLATE: &str =
    r#"{"rewrites":[{"source":"/docs/assets/:path*","destination":"{{ASSETS_URL}}/:path*"}]}"#;

fn scenario_generator() -> TemplateGenerator {
    let registry = EndpointRegistry::new(vec![ServiceEndpoint::new(
        "assets",
        "https://a.example",
        "https://a-staging.example",
    )])
    .expect("valid registry");
    TemplateGenerator::new(registry)
}

fn chassis_template() -> String {
    let rules: Vec<String> = [
        ("/docs/assets/:path*", "{{ASSETS_URL}}/:path*"),
        ("/docs/css/:path*", "{{CSS_URL}}/:path*"),
        ("/docs/tokens/:path*", "{{TOKENS_URL}}/:path*"),
        ("/docs/figma/:path*", "{{FIGMA_URL}}/:path*"),
        ("/docs/icons/:path*", "{{ICONS_URL}}/docs/icons/:path*"),
        ("/assets/icons/:path*", "{{ICONS_URL}}/assets/:path*"),
    ]
    .iter()
    .map(|(s, d)| format!("    {{ \"source\": \"{s}\", \"destination\": \"{d}\" }}"))
    .collect();
    format!(
        "{{\n  \"version\": 2,\n  \"headers\": [{{ \"source\": \"/(.*)\", \"destination\": \"{{{{CDN_URL}}}}\" }}],\n  \"rewrites\": [\n{}\n  ]\n}}\n",
        rules.join(",\n")
    )
}

/// Test: the documented staging/production switch for one endpoint
#[tokio::test]
async fn test_scenario_environment_switch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vercel.json");
    std::fs::write(&path, SCENARIO_TEMPLATE).unwrap();

    let generator = scenario_generator();

    generator
        .regenerate(&path, &path, EnvironmentKind::Staging)
        .expect("staging render");
    let staging = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        staging,
        r#"{"rewrites":[{"source":"/docs/assets/:path*","destination":"https://a-staging.example/:path*"}]}"#
    );

    generator
        .regenerate(&path, &path, EnvironmentKind::Production)
        .expect("production render");
    let production = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        production,
        r#"{"rewrites":[{"source":"/docs/assets/:path*","destination":"https://a.example/:path*"}]}"#
    );
}

/// Test: regenerating twice for the same environment is a no-op
#[tokio::test]
async fn test_template_regeneration_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vercel.json");
    let generator = TemplateGenerator::new(EndpointRegistry::chassis_defaults());

    for env in EnvironmentKind::ALL {
        std::fs::write(&path, chassis_template()).unwrap();
        let first = generator.regenerate(&path, &path, env).unwrap();
        let once = std::fs::read_to_string(&path).unwrap();
        let second = generator.regenerate(&path, &path, env).unwrap();
        let twice = std::fs::read_to_string(&path).unwrap();

        assert_eq!(once, twice, "{env} output changed on regeneration");
        assert!(first.changed);
        assert!(!second.changed);
        assert_eq!(first.digest, second.digest);
    }
}

/// Test: switching environments leaves no trace of the previous one
#[tokio::test]
async fn test_environment_switch_has_no_residue() {
    let generator = TemplateGenerator::new(EndpointRegistry::chassis_defaults());
    let template = chassis_template();

    for (from, to) in [
        (EnvironmentKind::Production, EnvironmentKind::Staging),
        (EnvironmentKind::Staging, EnvironmentKind::Production),
    ] {
        let previous = generator.render(&template, from).unwrap().text;
        let switched = generator.render(&previous, to).unwrap().text;
        let canonical = generator.render(&template, to).unwrap().text;
        assert_eq!(switched, canonical, "{from} -> {to} left residue");
    }

    let production = generator
        .render(&template, EnvironmentKind::Production)
        .unwrap()
        .text;
    assert!(!production.contains("-staging.vercel.app"));
}

/// Test: unknown placeholders survive byte-for-byte and are reported
#[tokio::test]
async fn test_unknown_placeholder_is_preserved() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("vercel.template.json");
    let output = dir.path().join("vercel.json");
    std::fs::write(&template, chassis_template()).unwrap();

    let generator = TemplateGenerator::new(EndpointRegistry::chassis_defaults());
    let report = generator
        .regenerate(&template, &output, EnvironmentKind::Staging)
        .unwrap();

    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.contains("\"destination\": \"{{CDN_URL}}\""));
    assert!(written.contains("https://chassis-css-staging.vercel.app/:path*"));
    assert_eq!(report.unmanaged, vec!["CDN_URL".to_string()]);

    // Template itself is never modified.
    assert_eq!(std::fs::read_to_string(&template).unwrap(), chassis_template());
}

/// Test: rewrite order follows rule declaration order in every environment
#[tokio::test]
async fn test_structured_output_preserves_rule_order() {
    let config = BuildConfig::default();
    let generator = config.structured_generator().unwrap();
    let expected: Vec<String> = chassis_default_rules()
        .into_iter()
        .map(|r| r.source)
        .collect();

    for env in EnvironmentKind::ALL {
        let sources: Vec<String> = generator
            .build(env)
            .rewrites
            .into_iter()
            .map(|r| r.source)
            .collect();
        assert_eq!(sources, expected);
    }
}

/// Test: structural generation ignores prior output and is idempotent
#[tokio::test]
async fn test_structured_write_is_idempotent_and_switch_safe() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vercel.json");
    std::fs::write(&path, "{ \"hand\": \"edited\" }").unwrap();

    let generator = StructuredGenerator::new(
        EndpointRegistry::chassis_defaults(),
        chassis_default_rules(),
        2,
        "pnpm build",
        "_site",
    )
    .unwrap();

    generator.write(&path, EnvironmentKind::Production).unwrap();
    generator.write(&path, EnvironmentKind::Staging).unwrap();
    let report = generator.write(&path, EnvironmentKind::Staging).unwrap();
    assert!(!report.changed);

    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, generator.render(EnvironmentKind::Staging).unwrap());

    let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(parsed["version"], 2);
    assert_eq!(parsed["outputDirectory"], "_site");
    assert_eq!(
        parsed["rewrites"][0]["destination"],
        "https://chassis-assets-staging.vercel.app/:path*"
    );
    assert!(parsed.get("hand").is_none());
}

/// Test: registries that could make regeneration ambiguous are rejected
#[test]
fn test_non_bijective_registry_rejected() {
    let shared_staging = EndpointRegistry::new(vec![
        ServiceEndpoint::new("css", "https://css.example", "https://staging.example"),
        ServiceEndpoint::new("tokens", "https://tokens.example", "https://staging.example"),
    ]);
    assert!(shared_staging.is_err());

    let mut duplicate = ServiceEndpoint::new("css2", "https://c2.example", "https://c2s.example");
    duplicate.placeholder = "CSS_URL".to_string();
    let duplicate_placeholder = EndpointRegistry::new(vec![
        ServiceEndpoint::new("css", "https://css.example", "https://css-s.example"),
        duplicate,
    ]);
    assert!(duplicate_placeholder.is_err());
}

/// Test: a URL that is a path prefix of another service's URL is rejected,
/// since `{{ASSETS_URL}}/icons/x` would read back as the icons service
#[test]
fn test_path_prefix_registry_rejected() {
    let overlapping = EndpointRegistry::new(vec![
        ServiceEndpoint::new("assets", "https://cdn.example", "https://cdn-staging.example"),
        ServiceEndpoint::new(
            "icons",
            "https://cdn.example/icons",
            "https://icons-staging.example",
        ),
    ]);
    let err = overlapping.unwrap_err();
    assert!(err.to_string().contains("https://cdn.example/icons"), "got: {err}");

    // With distinct hosts the same template switches environments cleanly.
    let generator = TemplateGenerator::new(
        EndpointRegistry::new(vec![
            ServiceEndpoint::new("assets", "https://cdn.example", "https://cdn-staging.example"),
            ServiceEndpoint::new(
                "icons",
                "https://icons.example",
                "https://icons-staging.example",
            ),
        ])
        .expect("valid registry"),
    );
    let template = r#"{"destination":"{{ASSETS_URL}}/icons/x"}"#;
    let production = generator.render(template, EnvironmentKind::Production).unwrap();
    let switched = generator.render(&production.text, EnvironmentKind::Staging).unwrap();
    let canonical = generator.render(template, EnvironmentKind::Staging).unwrap();
    assert_eq!(switched.text, canonical.text);
    assert_eq!(switched.text, r#"{"destination":"https://cdn-staging.example/icons/x"}"#);
}
