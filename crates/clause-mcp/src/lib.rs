//! MCP transport adapter (§6, §9): exposes clause-core's four tools over
//! `rmcp`'s `ServerHandler` + `#[tool_router]`/`#[tool]` surface. The
//! transport/framing itself (stdio here; HTTP/SSE is a drop-in alternative
//! transport `rmcp` also ships) is intentionally thin - every tool body
//! below is a direct call into `clause_core::tools`, never new business
//! logic, matching the spec's framing of the wire protocol as out of scope
//! for the core.

use std::sync::Arc;

use clause_core::metadata_store::MetadataStore;
use clause_core::model::{Category, DocType};
use clause_core::retriever::SharedRetriever;
use clause_core::tools::{self, SearchFilters, SurrenderOperation};
use clause_core::{ClauseError, Embedder};

use rmcp::handler::server::tool::ToolRouter;
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};
use rmcp::{tool, tool_handler, tool_router, transport::stdio, ErrorData as McpError, ServerHandler, ServiceExt};
use schemars::JsonSchema;
use serde::Deserialize;

#[derive(Clone)]
pub struct ClauseVaultServer {
    retriever: SharedRetriever,
    store: Arc<MetadataStore>,
    embedder: Arc<dyn Embedder>,
    tool_router: ToolRouter<Self>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchPolicyClauseArgs {
    pub query: String,
    pub company: Option<String>,
    pub product_code: Option<String>,
    pub product_name: Option<String>,
    /// One of "clause", "manual", "rate-table".
    pub doc_type: Option<String>,
    /// One of "Liability", "Exclusion", "Process", "Definition", "General".
    pub category: Option<String>,
    pub top_k: Option<usize>,
    pub min_similarity: Option<f32>,
}

fn parse_doc_type(value: &str) -> Result<DocType, McpError> {
    match value {
        "clause" => Ok(DocType::Clause),
        "manual" => Ok(DocType::Manual),
        "rate-table" => Ok(DocType::RateTable),
        other => Err(McpError::invalid_params(
            format!("unknown doc_type '{other}', expected 'clause', 'manual', or 'rate-table'"),
            None,
        )),
    }
}

fn parse_category(value: &str) -> Result<Category, McpError> {
    match value {
        "Liability" => Ok(Category::Liability),
        "Exclusion" => Ok(Category::Exclusion),
        "Process" => Ok(Category::Process),
        "Definition" => Ok(Category::Definition),
        "General" => Ok(Category::General),
        other => Err(McpError::invalid_params(
            format!("unknown category '{other}', expected 'Liability', 'Exclusion', 'Process', 'Definition', or 'General'"),
            None,
        )),
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CheckExclusionRiskArgs {
    pub scenario_description: String,
    pub product_code: Option<String>,
    pub strict: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CalculateSurrenderValueLogicArgs {
    pub product_code: String,
    pub policy_year: Option<u32>,
    pub operation: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LookupProductArgs {
    pub product_name: String,
    pub company: Option<String>,
    pub top_k: Option<usize>,
}

#[tool_router]
impl ClauseVaultServer {
    pub fn new(retriever: SharedRetriever, store: Arc<MetadataStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            retriever,
            store,
            embedder,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Search verified policy clauses with hybrid dense+sparse retrieval, returning ranked chunks with provenance.")]
    async fn search_policy_clause(&self, #[tool(aggr)] args: SearchPolicyClauseArgs) -> Result<CallToolResult, McpError> {
        let doc_type = args.doc_type.as_deref().map(parse_doc_type).transpose()?;
        let category = args.category.as_deref().map(parse_category).transpose()?;
        let filters = SearchFilters {
            company: args.company,
            product_code: args.product_code,
            product_name: args.product_name,
            doc_type,
            category,
        };
        let retriever = self.retriever.load();
        let results = tools::search_policy_clause(
            &retriever,
            self.embedder.as_ref(),
            &args.query,
            filters,
            args.top_k.unwrap_or(5),
            args.min_similarity.unwrap_or(-1.0),
        )
        .await
        .map_err(to_mcp_error)?;

        json_result(&results)
    }

    #[tool(description = "Check whether a described claim scenario falls under an exclusion clause; never adjudicates a claim.")]
    async fn check_exclusion_risk(&self, #[tool(aggr)] args: CheckExclusionRiskArgs) -> Result<CallToolResult, McpError> {
        let retriever = self.retriever.load();
        let result = tools::check_exclusion_risk(
            &retriever,
            self.embedder.as_ref(),
            &args.scenario_description,
            args.product_code,
            args.strict.unwrap_or(true),
        )
        .await
        .map_err(to_mcp_error)?;

        json_result(&result)
    }

    #[tool(description = "Explain surrender / reduced-paid-up logic for a product, with related rate-table references.")]
    async fn calculate_surrender_value_logic(
        &self,
        #[tool(aggr)] args: CalculateSurrenderValueLogicArgs,
    ) -> Result<CallToolResult, McpError> {
        let operation = match args.operation.as_str() {
            "surrender" => SurrenderOperation::Surrender,
            "reduced_paid_up" => SurrenderOperation::ReducedPaidUp,
            other => {
                return Err(McpError::invalid_params(
                    format!("unknown operation '{other}', expected 'surrender' or 'reduced_paid_up'"),
                    None,
                ))
            }
        };

        let retriever = self.retriever.load();
        let result = tools::calculate_surrender_value_logic(
            &retriever,
            self.embedder.as_ref(),
            &args.product_code,
            args.policy_year,
            operation,
        )
        .await
        .map_err(to_mcp_error)?;

        json_result(&result)
    }

    #[tool(description = "Fuzzy-match a product by name, optionally scoped to a company. Does not touch the vector index.")]
    fn lookup_product(&self, #[tool(aggr)] args: LookupProductArgs) -> Result<CallToolResult, McpError> {
        let result = tools::lookup_product(&self.store, &args.product_name, args.company.as_deref(), args.top_k.unwrap_or(5))
            .map_err(to_mcp_error)?;
        json_result(&result)
    }
}

#[tool_handler]
impl ServerHandler for ClauseVaultServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Four tools over a verified Chinese insurance policy clause corpus: \
                 search_policy_clause, check_exclusion_risk, calculate_surrender_value_logic, \
                 lookup_product. Every result carries provenance; an empty list is a valid answer."
                    .to_string(),
            ),
            ..Default::default()
        }
    }
}

fn json_result<T: serde::Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string(value).map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

fn to_mcp_error(error: ClauseError) -> McpError {
    match error {
        ClauseError::InvalidInput(msg) => McpError::invalid_params(msg, None),
        ClauseError::NotFound(msg) => McpError::invalid_params(msg, None),
        ClauseError::EmptyResult => McpError::internal_error("no chunk met the similarity threshold", None),
        ClauseError::CircuitOpen => McpError::internal_error("circuit open, back off before retrying", None),
        ClauseError::ParseFailure(msg) => McpError::internal_error(msg, None),
        ClauseError::IndexMismatch { query_dim, index_dim } => McpError::internal_error(
            format!("query embedding dimension {query_dim} does not match stored index dimension {index_dim}"),
            None,
        ),
        ClauseError::Timeout => McpError::internal_error("operation timed out", None),
        ClauseError::InternalError(msg) => McpError::internal_error(msg, None),
    }
}

/// Run the MCP server over stdio until the peer disconnects.
pub async fn serve_stdio(
    retriever: SharedRetriever,
    store: Arc<MetadataStore>,
    embedder: Arc<dyn Embedder>,
) -> Result<(), Box<dyn std::error::Error>> {
    let server = ClauseVaultServer::new(retriever, store, embedder);
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}
