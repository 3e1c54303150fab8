use legis::{SourcesConfig, catalog};
use runtime::{Arguments, ToolError, ToolOutcome, ToolRegistry};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn args(value: Value) -> Arguments {
    value.as_object().cloned().unwrap_or_default()
}

fn registry(server: &MockServer) -> ToolRegistry {
    let config = SourcesConfig {
        senado_base_url: format!("{}/dadosabertos", server.uri()),
        camara_base_url: format!("{}/api/v2", server.uri()),
        timeout_secs: 5,
    };
    ToolRegistry::new(catalog(&config).unwrap()).unwrap()
}

#[test]
fn catalog_registers_every_tool_once() {
    let specs = catalog(&SourcesConfig::default()).unwrap();
    assert_eq!(specs.len(), 31);

    let registry = ToolRegistry::new(specs).unwrap();
    for name in [
        "buscar_senadores",
        "listar_comissoes_senado",
        "mesa_diretora_senado_federal",
        "buscar_deputados",
        "despesas_deputado",
        "frentes_parlamentares",
    ] {
        assert!(registry.lookup(name).is_ok(), "missing {name}");
    }
}

#[tokio::test]
async fn senators_of_ceara_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dadosabertos/senador/lista/atual.json"))
        .and(query_param("uf", "CE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ListaParlamentarEmExercicio": {"Parlamentares": {"Parlamentar": [
                {"IdentificacaoParlamentar": {"NomeParlamentar": "Cid Gomes"}}
            ]}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = registry(&server)
        .invoke("buscar_senadores", &args(json!({"uf": "ce"})))
        .await;

    let ToolOutcome::Success { output } = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert_eq!(
        output["ListaParlamentarEmExercicio"]["Parlamentares"]["Parlamentar"][0]
            ["IdentificacaoParlamentar"]["NomeParlamentar"],
        "Cid Gomes"
    );
}

#[tokio::test]
async fn upstream_errors_become_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/deputados/0"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"status": 404})))
        .mount(&server)
        .await;

    let outcome = registry(&server)
        .invoke("detalhes_deputado", &args(json!({"id_deputado": "0"})))
        .await;
    assert!(matches!(
        outcome,
        ToolOutcome::Failure {
            error: ToolError::Execution(_)
        }
    ));
}

#[tokio::test]
async fn missing_required_parameter_never_hits_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = registry(&server)
        .invoke("despesas_deputado", &args(json!({"id_deputado": "204554"})))
        .await;
    assert!(matches!(
        outcome,
        ToolOutcome::Failure {
            error: ToolError::InvalidArguments(_)
        }
    ));
}
