//! Senado Federal tools.
//!
//! Most endpoints are requested with the `.json` suffix. The committee list
//! and committee details are only useful in their XML rendering, which is
//! passed through as text.

use std::sync::Arc;

use runtime::ParamType::String as Str;
use runtime::{Arguments, ParamSpec, ToolError, ToolSpec};

use crate::client::{DadosAbertos, Query};
use crate::endpoint::{endpoint, opt, opt_segment, opt_upper, segment};

pub(crate) fn tools(client: &Arc<DadosAbertos>) -> Vec<ToolSpec> {
    vec![
        endpoint(
            client,
            "buscar_senadores",
            "Lista senadores em exercício, opcionalmente filtrados por UF.",
            buscar_senadores,
        )
        .param(ParamSpec::optional(
            "uf",
            Str,
            "Sigla do estado (ex: 'SP', 'RJ', 'MG'); omita para todos",
        )),
        endpoint(
            client,
            "buscar_proposicoes_senado",
            "Busca proposições no Senado por tipo e ano.",
            buscar_proposicoes,
        )
        .param(ParamSpec::required(
            "sigla",
            Str,
            "Tipo da proposição (ex: 'PEC', 'PL', 'PLS', 'MPV')",
        ))
        .param(ParamSpec::optional(
            "ano",
            Str,
            "Ano da proposição (ex: '2024', '2025')",
        )),
        endpoint(
            client,
            "detalhes_proposicao_senado",
            "Obtém detalhes completos de uma proposição do Senado.",
            detalhes_proposicao,
        )
        .param(ParamSpec::required(
            "codigo",
            Str,
            "Código da proposição (ex: '132046')",
        )),
        endpoint(
            client,
            "votacoes_senado",
            "Lista votações do Senado em um período.",
            votacoes,
        )
        .param(ParamSpec::required(
            "data_inicio",
            Str,
            "Data inicial no formato AAAAMMDD (ex: '20250101')",
        ))
        .param(ParamSpec::optional(
            "data_fim",
            Str,
            "Data final no formato AAAAMMDD",
        )),
        endpoint(
            client,
            "listar_comissoes_senado",
            "Lista comissões do Senado Federal, com códigos e nomes em XML.",
            listar_comissoes,
        )
        .param(ParamSpec::optional(
            "tipo",
            Str,
            "Tipo da comissão: 'permanente', 'cpi', 'temporaria' ou 'orgaos' \
             (padrão: 'permanente')",
        )),
        endpoint(
            client,
            "detalhes_comissao_senado",
            "Obtém detalhes de uma comissão do Senado.",
            detalhes_comissao,
        )
        .param(ParamSpec::required(
            "codigo",
            Str,
            "Código numérico da comissão (ex: '40' para CAS, '38' para CAE, '34' para CCJ)",
        )),
        endpoint(
            client,
            "membros_comissao_senado",
            "Lista membros de uma comissão do Senado, com seus cargos.",
            membros_comissao,
        )
        .param(ParamSpec::required("codigo", Str, "Código da comissão")),
        endpoint(
            client,
            "reunioes_comissao_senado",
            "Lista reuniões de uma comissão do Senado.",
            reunioes_comissao,
        )
        .param(ParamSpec::required("codigo", Str, "Código da comissão"))
        .param(ParamSpec::optional(
            "data_inicio",
            Str,
            "Data inicial no formato AAAAMMDD",
        ))
        .param(ParamSpec::optional(
            "data_fim",
            Str,
            "Data final no formato AAAAMMDD",
        )),
        endpoint(
            client,
            "buscar_agenda_comissao",
            "Busca a agenda de comissões do Senado em um período para encontrar códigos de \
             reuniões. Use antes de buscar detalhes de uma reunião.",
            agenda_comissao,
        )
        .param(ParamSpec::required(
            "data_inicio",
            Str,
            "Data inicial no formato AAAAMMDD (ex: '20251209')",
        ))
        .param(ParamSpec::optional(
            "data_fim",
            Str,
            "Data final no formato AAAAMMDD; se omitida, usa data_inicio",
        )),
        endpoint(
            client,
            "detalhes_reuniao_comissao",
            "Obtém detalhes completos de uma reunião de comissão: pauta, participantes e \
             resultados.",
            detalhes_reuniao,
        )
        .param(ParamSpec::required(
            "codigo_reuniao",
            Str,
            "Código da reunião obtido via buscar_agenda_comissao",
        )),
        endpoint(
            client,
            "videos_reuniao_comissao",
            "Obtém os vídeos de uma reunião específica de comissão.",
            videos_reuniao,
        )
        .param(ParamSpec::required(
            "codigo_reuniao",
            Str,
            "Código da reunião (ex: '72345')",
        )),
        endpoint(
            client,
            "agenda_senado",
            "Obtém a agenda geral do Senado Federal (sessões plenárias).",
            agenda,
        )
        .param(ParamSpec::optional(
            "data",
            Str,
            "Data no formato AAAAMMDD (ex: '20250123'); se omitida, retorna a agenda atual",
        )),
        endpoint(
            client,
            "materia_senado",
            "Obtém informações completas sobre uma matéria legislativa do Senado.",
            materia,
        )
        .param(ParamSpec::required(
            "codigo",
            Str,
            "Código da matéria (ex: '132046')",
        )),
        endpoint(
            client,
            "autorias_senador",
            "Lista proposições de autoria de um senador.",
            autorias,
        )
        .param(ParamSpec::required("codigo_senador", Str, "Código do senador")),
        endpoint(
            client,
            "listar_partidos_senado",
            "Obtém a lista dos partidos políticos em atividade e extintos no Senado Federal.",
            |_| Ok(Query::senado("/composicao/lista/partidos")),
        ),
        endpoint(
            client,
            "listar_tipos_cargo_comissoes",
            "Obtém a lista de tipos de cargo nas comissões do Senado Federal e do Congresso \
             Nacional.",
            |_| Ok(Query::senado("/composicao/lista/tiposCargo")),
        ),
        endpoint(
            client,
            "mesa_diretora_congresso_nacional",
            "Obtém a composição da Mesa Diretora do Congresso Nacional.",
            |_| Ok(Query::senado("/composicao/mesaCN")),
        ),
        endpoint(
            client,
            "mesa_diretora_senado_federal",
            "Obtém a composição da Mesa Diretora do Senado Federal.",
            |_| Ok(Query::senado("/composicao/mesaSF")),
        ),
    ]
}

fn buscar_senadores(args: &Arguments) -> Result<Query, ToolError> {
    Ok(Query::senado("/senador/lista/atual").param_opt("uf", opt_upper(args, "uf")))
}

fn buscar_proposicoes(args: &Arguments) -> Result<Query, ToolError> {
    let mut path = format!("/proposicao/sigla/{}", segment(args, "sigla")?.to_uppercase());
    if let Some(ano) = opt_segment(args, "ano")? {
        path.push_str(&format!("/ano/{ano}"));
    }
    Ok(Query::senado(path))
}

fn detalhes_proposicao(args: &Arguments) -> Result<Query, ToolError> {
    Ok(Query::senado(format!("/proposicao/{}", segment(args, "codigo")?)))
}

fn votacoes(args: &Arguments) -> Result<Query, ToolError> {
    let mut path = format!("/plenario/votacao/lista/data/{}", segment(args, "data_inicio")?);
    if let Some(fim) = opt_segment(args, "data_fim")? {
        path.push_str(&format!("/data/{fim}"));
    }
    Ok(Query::senado(path))
}

/// Map a free-form committee type onto the API's list names.
fn committee_kind(tipo: Option<&str>) -> &'static str {
    let tipo = tipo.map(str::to_lowercase).unwrap_or_default();
    match tipo.as_str() {
        "cpi" => "cpi",
        "temporaria" | "temporária" => "temporaria",
        "orgaos" | "órgãos" | "orgao" | "órgão" => "orgaos",
        _ => "permanente",
    }
}

fn listar_comissoes(args: &Arguments) -> Result<Query, ToolError> {
    let kind = committee_kind(opt(args, "tipo").as_deref());
    Ok(Query::senado_raw(format!("/comissao/lista/{kind}")))
}

fn detalhes_comissao(args: &Arguments) -> Result<Query, ToolError> {
    Ok(Query::senado_raw(format!("/comissao/{}", segment(args, "codigo")?)))
}

fn membros_comissao(args: &Arguments) -> Result<Query, ToolError> {
    Ok(Query::senado_raw(format!("/comissao/{}/membros", segment(args, "codigo")?)))
}

fn reunioes_comissao(args: &Arguments) -> Result<Query, ToolError> {
    Ok(
        Query::senado_raw(format!("/comissao/{}/reunioes", segment(args, "codigo")?))
            .param_opt("dataInicio", opt(args, "data_inicio"))
            .param_opt("dataFim", opt(args, "data_fim")),
    )
}

fn agenda_comissao(args: &Arguments) -> Result<Query, ToolError> {
    let inicio = segment(args, "data_inicio")?;
    let fim = opt_segment(args, "data_fim")?.unwrap_or_else(|| inicio.clone());
    Ok(Query::senado(format!("/comissao/agenda/{inicio}/{fim}")))
}

fn detalhes_reuniao(args: &Arguments) -> Result<Query, ToolError> {
    Ok(Query::senado(format!(
        "/comissao/reuniao/{}",
        segment(args, "codigo_reuniao")?
    )))
}

fn videos_reuniao(args: &Arguments) -> Result<Query, ToolError> {
    Ok(Query::senado(format!(
        "/comissao/reuniao/{}/videos",
        segment(args, "codigo_reuniao")?
    )))
}

fn agenda(args: &Arguments) -> Result<Query, ToolError> {
    Ok(Query::senado_raw("/agenda").param_opt("data", opt(args, "data")))
}

fn materia(args: &Arguments) -> Result<Query, ToolError> {
    Ok(Query::senado_raw(format!("/materia/{}", segment(args, "codigo")?)))
}

fn autorias(args: &Arguments) -> Result<Query, ToolError> {
    Ok(Query::senado_raw(format!(
        "/senador/{}/autorias",
        segment(args, "codigo_senador")?
    )))
}
