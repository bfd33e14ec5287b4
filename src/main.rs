use deduction_oracle::core::{ErrorCode, OracleResponse, QueryParams, QueryType};
use deduction_oracle::{logging, AccessManager, OracleConfig};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// One line of input
#[derive(Debug, Deserialize)]
struct QueryLine {
    agent: String,
    query_type: String,
    #[serde(default)]
    params: QueryParams,
}

async fn answer(manager: &AccessManager, line: &str) -> OracleResponse {
    let query: QueryLine = match serde_json::from_str(line) {
        Ok(query) => query,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed query line");
            return OracleResponse::denied(
                "",
                QueryType::DatasetAccess,
                ErrorCode::InvalidParams,
                format!("Malformed query line: {}", e),
            );
        }
    };

    match query.query_type.parse::<QueryType>() {
        Ok(query_type) => {
            manager
                .execute_query(&query.agent, query_type, &query.params)
                .await
        }
        Err(e) => {
            tracing::warn!(agent = %query.agent, error = %e, "Unknown query type");
            OracleResponse::denied(
                &query.agent,
                QueryType::DatasetAccess,
                ErrorCode::InvalidParams,
                e.to_string(),
            )
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("ORACLE_CONFIG").ok());
    let config = match &config_path {
        Some(path) => OracleConfig::from_file(path)?,
        None => OracleConfig::demo(),
    };

    // Keep the guard alive so file logs are flushed on exit
    let _guard = logging::init_logging(&config.logging)?;

    tracing::info!(config = ?config_path, agents = config.rules.len(), "=== Oracle starting ===");

    let manager = config.build()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = answer(&manager, &line).await;
        let mut encoded = serde_json::to_string(&response)?;
        encoded.push('\n');
        stdout.write_all(encoded.as_bytes()).await?;
        stdout.flush().await?;
    }

    let stats = manager.stats();
    tracing::info!(
        total = stats.total_queries,
        successful = stats.successful,
        denied = stats.denied,
        "=== Oracle shutting down ==="
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_query_type_keeps_agent() {
        let manager = OracleConfig::demo().build().unwrap();
        let response = answer(&manager, r#"{"agent": "Watson", "query_type": "teleport"}"#).await;

        assert!(!response.authorized);
        assert_eq!(response.agent_name, "Watson");
        assert_eq!(response.error_code, Some(ErrorCode::InvalidParams));
        assert!(response.message.contains("teleport"));
    }

    #[tokio::test]
    async fn test_malformed_line_is_answered() {
        let manager = OracleConfig::demo().build().unwrap();
        let response = answer(&manager, "not json").await;

        assert!(!response.authorized);
        assert_eq!(response.agent_name, "");
        assert_eq!(response.error_code, Some(ErrorCode::InvalidParams));
    }
}
