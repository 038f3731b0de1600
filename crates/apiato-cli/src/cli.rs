use apiato_provider::config::Config;
use apiato_provider::domain::params::*;
use apiato_provider::ports::data_provider::{DataProvider, DataProviderError};
use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value};

#[derive(Parser, Debug)]
#[command(
    name = "apiato",
    version,
    about = "Run data provider operations against an Apiato REST API"
)]
pub struct Cli {
    /// API base URL (overrides APIATO_API_URL)
    #[arg(long)]
    pub api_url: Option<String>,

    /// Request timeout in milliseconds (overrides APIATO_TIMEOUT_MS)
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Log every request to stderr
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct PageArgs {
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    #[arg(long, default_value_t = 10)]
    pub per_page: u32,

    /// Field to sort on
    #[arg(long, default_value = "id")]
    pub sort: String,

    /// ASC, DESC, or anything the API understands
    #[arg(long, default_value = "ASC")]
    pub order: SortOrder,
}

impl PageArgs {
    fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }

    fn sort(&self) -> Sort {
        Sort {
            field: self.sort.clone(),
            order: self.order.clone(),
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fetch one page of a resource
    List {
        resource: String,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Fetch a single record
    Get { resource: String, id: Identifier },
    /// Fetch several records by id in one request
    GetMany {
        resource: String,
        #[arg(required = true)]
        ids: Vec<Identifier>,
    },
    /// Fetch one page of records related to another record
    GetManyReference {
        resource: String,
        /// Relation field, e.g. post_id
        #[arg(long)]
        target: String,
        /// Id of the related record
        #[arg(long)]
        id: Identifier,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Patch one record
    Update {
        resource: String,
        id: Identifier,
        /// JSON object with the fields to change
        #[arg(long, value_parser = parse_object)]
        data: Map<String, Value>,
    },
    /// Patch several records with the same fields
    UpdateMany {
        resource: String,
        #[arg(required = true)]
        ids: Vec<Identifier>,
        #[arg(long, value_parser = parse_object)]
        data: Map<String, Value>,
    },
    /// Create a record
    Create {
        resource: String,
        #[arg(long, value_parser = parse_object)]
        data: Map<String, Value>,
    },
    /// Delete one record
    Delete { resource: String, id: Identifier },
    /// Delete several records
    DeleteMany {
        resource: String,
        #[arg(required = true)]
        ids: Vec<Identifier>,
    },
}

impl Cli {
    /// Flags win over whatever came from the environment.
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(url) = &self.api_url {
            config.api_url = url.clone();
        }
        if let Some(ms) = self.timeout_ms {
            config.timeout_ms = Some(ms);
        }
        config
    }
}

fn parse_object(raw: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, got {other}")),
        Err(e) => Err(format!("invalid JSON: {e}")),
    }
}

/// Runs `command` and returns its result envelope as JSON.
pub async fn run<P>(provider: &P, command: Command) -> Result<Value, DataProviderError>
where
    P: DataProvider + ?Sized,
{
    let value = match command {
        Command::List { resource, page } => {
            let params = GetListParams {
                pagination: page.pagination(),
                sort: page.sort(),
            };
            serde_json::to_value(provider.get_list(&resource, params).await?)?
        }
        Command::Get { resource, id } => {
            serde_json::to_value(provider.get_one(&resource, GetOneParams { id }).await?)?
        }
        Command::GetMany { resource, ids } => {
            serde_json::to_value(provider.get_many(&resource, GetManyParams { ids }).await?)?
        }
        Command::GetManyReference {
            resource,
            target,
            id,
            page,
        } => {
            let params = GetManyReferenceParams {
                target,
                id,
                pagination: page.pagination(),
                sort: page.sort(),
            };
            serde_json::to_value(provider.get_many_reference(&resource, params).await?)?
        }
        Command::Update { resource, id, data } => {
            let params = UpdateParams { id, data };
            serde_json::to_value(provider.update(&resource, params).await?)?
        }
        Command::UpdateMany {
            resource,
            ids,
            data,
        } => {
            let params = UpdateManyParams { ids, data };
            serde_json::to_value(provider.update_many(&resource, params).await?)?
        }
        Command::Create { resource, data } => {
            serde_json::to_value(provider.create(&resource, CreateParams { data }).await?)?
        }
        Command::Delete { resource, id } => {
            serde_json::to_value(provider.delete(&resource, DeleteParams { id }).await?)?
        }
        Command::DeleteMany { resource, ids } => {
            let params = DeleteManyParams { ids };
            serde_json::to_value(provider.delete_many(&resource, params).await?)?
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiato_mock::recording::RecordingTransport;
    use apiato_provider::domain::http::HttpMethod;
    use apiato_provider::ApiatoDataProvider;
    use serde_json::json;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("apiato").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn list_defaults() {
        let cli = parse(&["list", "posts"]);
        match cli.command {
            Command::List { resource, page } => {
                assert_eq!(resource, "posts");
                assert_eq!(page.pagination(), Pagination { page: 1, per_page: 10 });
                assert_eq!(page.sort().field, "id");
                assert_eq!(page.sort().order, SortOrder::Asc);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn ids_parse_as_integers_when_possible() {
        let cli = parse(&["delete-many", "posts", "1", "x7"]);
        match cli.command {
            Command::DeleteMany { ids, .. } => {
                assert_eq!(ids, vec![Identifier::Int(1), Identifier::from("x7")]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn data_must_be_a_json_object() {
        let bad = Cli::try_parse_from(["apiato", "create", "posts", "--data", "[1]"]);
        assert!(bad.is_err());

        let cli = parse(&["create", "posts", "--data", r#"{"title":"x"}"#]);
        match cli.command {
            Command::Create { data, .. } => assert_eq!(data["title"], "x"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn flags_override_config() {
        let cli = parse(&["--api-url", "http://flag", "--timeout-ms", "50", "get", "posts", "1"]);
        let config = cli.apply(Config {
            api_url: "http://env".into(),
            timeout_ms: None,
        });
        assert_eq!(config.api_url, "http://flag");
        assert_eq!(config.timeout_ms, Some(50));
    }

    #[tokio::test]
    async fn run_prints_the_result_envelope() {
        let transport = RecordingTransport::new();
        transport.respond(
            HttpMethod::Get,
            "http://api/posts/1",
            json!({ "data": { "id": 1, "title": "x" } }),
        );
        let provider = ApiatoDataProvider::with_transport("http://api", transport);

        let out = run(&provider, parse(&["get", "posts", "1"]).command)
            .await
            .unwrap();
        assert_eq!(out, json!({ "data": { "id": 1, "title": "x" } }));
    }
}
