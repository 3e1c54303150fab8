//! Câmara dos Deputados tools.
//!
//! List endpoints are always requested with a fixed ordering so results are
//! stable between calls.

use std::sync::Arc;

use runtime::ParamType::String as Str;
use runtime::{Arguments, ParamSpec, ToolError, ToolSpec};

use crate::client::{DadosAbertos, Query};
use crate::endpoint::{endpoint, opt, opt_upper, segment};

pub(crate) fn tools(client: &Arc<DadosAbertos>) -> Vec<ToolSpec> {
    vec![
        endpoint(
            client,
            "buscar_deputados",
            "Lista deputados em exercício, com filtros opcionais por estado e partido.",
            buscar_deputados,
        )
        .param(ParamSpec::optional("siglaUf", Str, "Sigla do estado (ex: 'SP', 'RJ')"))
        .param(ParamSpec::optional(
            "siglaPartido",
            Str,
            "Sigla do partido (ex: 'PT', 'PL', 'PSDB')",
        )),
        endpoint(
            client,
            "detalhes_deputado",
            "Obtém informações detalhadas de um deputado: biografia, contatos e redes sociais.",
            detalhes_deputado,
        )
        .param(ParamSpec::required(
            "id_deputado",
            Str,
            "ID do deputado (obtido via buscar_deputados)",
        )),
        endpoint(
            client,
            "buscar_proposicoes_camara",
            "Busca proposições na Câmara dos Deputados.",
            buscar_proposicoes,
        )
        .param(ParamSpec::optional(
            "siglaTipo",
            Str,
            "Tipo da proposição (ex: 'PL', 'PEC', 'MPV')",
        ))
        .param(ParamSpec::optional("ano", Str, "Ano da proposição (ex: '2024')"))
        .param(ParamSpec::optional("autor", Str, "Nome ou ID do autor"))
        .param(ParamSpec::optional("keywords", Str, "Palavras-chave para busca")),
        endpoint(
            client,
            "detalhes_proposicao_camara",
            "Obtém detalhes completos de uma proposição da Câmara: ementa, autoria e tramitação.",
            detalhes_proposicao,
        )
        .param(ParamSpec::required(
            "id_proposicao",
            Str,
            "ID da proposição (obtido via buscar_proposicoes_camara)",
        )),
        endpoint(
            client,
            "votacoes_camara",
            "Lista votações da Câmara dos Deputados com resultados.",
            votacoes,
        )
        .param(ParamSpec::optional("id_proposicao", Str, "ID da proposição"))
        .param(ParamSpec::optional("dataInicio", Str, "Data inicial no formato AAAA-MM-DD"))
        .param(ParamSpec::optional("dataFim", Str, "Data final no formato AAAA-MM-DD")),
        endpoint(
            client,
            "despesas_deputado",
            "Obtém despesas da cota parlamentar de um deputado.",
            despesas_deputado,
        )
        .param(ParamSpec::required("id_deputado", Str, "ID do deputado"))
        .param(ParamSpec::required("ano", Str, "Ano das despesas (ex: '2024')"))
        .param(ParamSpec::optional("mes", Str, "Mês das despesas (1-12)")),
        endpoint(
            client,
            "eventos_camara",
            "Lista eventos (reuniões, audiências) da Câmara.",
            eventos,
        )
        .param(ParamSpec::optional("dataInicio", Str, "Data inicial no formato AAAA-MM-DD"))
        .param(ParamSpec::optional("dataFim", Str, "Data final no formato AAAA-MM-DD")),
        endpoint(
            client,
            "listar_orgaos_camara",
            "Lista todos os órgãos (comissões, frentes etc.) da Câmara, com IDs e siglas.",
            |_| Ok(Query::camara("/orgaos").ordered("ASC", "sigla")),
        ),
        endpoint(
            client,
            "detalhes_orgao_camara",
            "Obtém detalhes de um órgão (comissão) da Câmara.",
            detalhes_orgao,
        )
        .param(ParamSpec::required(
            "id_orgao",
            Str,
            "ID do órgão (obtido via listar_orgaos_camara)",
        )),
        endpoint(
            client,
            "membros_orgao_camara",
            "Lista membros de um órgão (comissão) da Câmara, com cargos e titularidade.",
            membros_orgao,
        )
        .param(ParamSpec::required("id_orgao", Str, "ID do órgão")),
        endpoint(
            client,
            "partidos_camara",
            "Lista partidos com representação na Câmara dos Deputados.",
            |_| Ok(Query::camara("/partidos").ordered("ASC", "sigla")),
        ),
        endpoint(
            client,
            "blocos_camara",
            "Lista blocos parlamentares da Câmara dos Deputados.",
            |_| Ok(Query::camara("/blocos").ordered("ASC", "nome")),
        ),
        endpoint(
            client,
            "frentes_parlamentares",
            "Lista frentes parlamentares da Câmara dos Deputados.",
            |_| Ok(Query::camara("/frentes").ordered("ASC", "titulo")),
        ),
    ]
}

fn buscar_deputados(args: &Arguments) -> Result<Query, ToolError> {
    Ok(Query::camara("/deputados")
        .ordered("ASC", "nome")
        .param_opt("siglaUf", opt_upper(args, "siglaUf"))
        .param_opt("siglaPartido", opt_upper(args, "siglaPartido")))
}

fn detalhes_deputado(args: &Arguments) -> Result<Query, ToolError> {
    Ok(Query::camara(format!("/deputados/{}", segment(args, "id_deputado")?)))
}

fn buscar_proposicoes(args: &Arguments) -> Result<Query, ToolError> {
    Ok(Query::camara("/proposicoes")
        .ordered("DESC", "id")
        .param_opt("siglaTipo", opt_upper(args, "siglaTipo"))
        .param_opt("ano", opt(args, "ano"))
        .param_opt("autor", opt(args, "autor"))
        .param_opt("keywords", opt(args, "keywords")))
}

fn detalhes_proposicao(args: &Arguments) -> Result<Query, ToolError> {
    Ok(Query::camara(format!(
        "/proposicoes/{}",
        segment(args, "id_proposicao")?
    )))
}

fn votacoes(args: &Arguments) -> Result<Query, ToolError> {
    Ok(Query::camara("/votacoes")
        .ordered("DESC", "dataHoraRegistro")
        .param_opt("idProposicao", opt(args, "id_proposicao"))
        .param_opt("dataInicio", opt(args, "dataInicio"))
        .param_opt("dataFim", opt(args, "dataFim")))
}

fn despesas_deputado(args: &Arguments) -> Result<Query, ToolError> {
    let ano = opt(args, "ano").ok_or_else(|| {
        ToolError::InvalidArguments("parameter `ano` must not be blank".into())
    })?;
    Ok(
        Query::camara(format!("/deputados/{}/despesas", segment(args, "id_deputado")?))
            .param("ano", ano)
            .ordered("DESC", "dataDocumento")
            .param_opt("mes", opt(args, "mes")),
    )
}

fn eventos(args: &Arguments) -> Result<Query, ToolError> {
    Ok(Query::camara("/eventos")
        .ordered("ASC", "dataHoraInicio")
        .param_opt("dataInicio", opt(args, "dataInicio"))
        .param_opt("dataFim", opt(args, "dataFim")))
}

fn detalhes_orgao(args: &Arguments) -> Result<Query, ToolError> {
    Ok(Query::camara(format!("/orgaos/{}", segment(args, "id_orgao")?)))
}

fn membros_orgao(args: &Arguments) -> Result<Query, ToolError> {
    Ok(Query::camara(format!("/orgaos/{}/membros", segment(args, "id_orgao")?)))
}
