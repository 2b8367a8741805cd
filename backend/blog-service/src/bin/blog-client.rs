use std::env;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use blog_service::config::{LogFormat, TracingConfig};
use blog_service::grpc::blog::blog_service_client::BlogServiceClient;
use blog_service::grpc::blog::{
    BlogPost, CreatePostRequest, DeletePostRequest, ReadAllRequest, ReadPostRequest,
    UpdatePostRequest,
};
use blog_service::grpc::datetime_to_timestamp;
use blog_service::telemetry::{init_tracing, shutdown_tracing};
use chrono::Utc;
use tonic::transport::{Channel, Endpoint};
use tracing::Instrument;

/// Applies to connecting and to every call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

fn usage() {
    eprintln!("Usage:");
    eprintln!("  blog-client <endpoint> create <title> <content> <author> [tags...]");
    eprintln!("  blog-client <endpoint> fetch <post_id>");
    eprintln!("  blog-client <endpoint> fetchall");
    eprintln!("  blog-client <endpoint> update <post_id> <title> <content> <author> [tags...]");
    eprintln!("  blog-client <endpoint> delete <post_id>");
}

#[derive(Debug, PartialEq)]
enum Command {
    Create(CreatePostRequest),
    Fetch(ReadPostRequest),
    FetchAll,
    Update(UpdatePostRequest),
    Delete(DeletePostRequest),
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Fetch(_) => "fetch",
            Self::FetchAll => "fetchall",
            Self::Update(_) => "update",
            Self::Delete(_) => "delete",
        }
    }
}

/// Parse everything after the endpoint argument.
fn parse_command(args: &[String]) -> Option<Command> {
    let (name, rest) = args.split_first()?;

    match (name.as_str(), rest) {
        ("create", [title, content, author, tags @ ..]) => Some(Command::Create(CreatePostRequest {
            title: title.clone(),
            content: content.clone(),
            author: author.clone(),
            publication_date: Some(datetime_to_timestamp(&Utc::now())),
            tags: tags.to_vec(),
        })),
        ("fetch", [post_id]) => Some(Command::Fetch(ReadPostRequest {
            post_id: post_id.clone(),
        })),
        ("fetchall", []) => Some(Command::FetchAll),
        ("update", [post_id, title, content, author, tags @ ..]) => {
            Some(Command::Update(UpdatePostRequest {
                post_id: post_id.clone(),
                title: title.clone(),
                content: content.clone(),
                author: author.clone(),
                publication_date: Some(datetime_to_timestamp(&Utc::now())),
                tags: tags.to_vec(),
            }))
        }
        ("delete", [post_id]) => Some(Command::Delete(DeletePostRequest {
            post_id: post_id.clone(),
        })),
        _ => None,
    }
}

fn print_post(post: &BlogPost) {
    println!(
        "{}\t{}\t{}\t[{}]",
        post.post_id,
        post.title,
        post.author,
        post.tags.join(", ")
    );
}

fn check_error(error: &str) -> Result<()> {
    if error.is_empty() {
        Ok(())
    } else {
        bail!("{}", error)
    }
}

async fn connect(endpoint: &str) -> Result<BlogServiceClient<Channel>> {
    let channel = Endpoint::from_shared(endpoint.to_string())
        .with_context(|| format!("Invalid endpoint {}", endpoint))?
        .connect_timeout(REQUEST_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .connect()
        .await
        .with_context(|| format!("Failed to connect to {}", endpoint))?;

    Ok(BlogServiceClient::new(channel))
}

async fn run(endpoint: &str, command: Command) -> Result<()> {
    let mut client = connect(endpoint).await?;

    match command {
        Command::Create(request) => {
            let resp = client
                .create_post(request)
                .await
                .context("CreatePost failed")?
                .into_inner();
            check_error(&resp.error)?;
            if let Some(post) = resp.post {
                print_post(&post);
            }
        }
        Command::Fetch(request) => {
            let resp = client
                .read_post(request)
                .await
                .context("ReadPost failed")?
                .into_inner();
            check_error(&resp.error)?;
            if let Some(post) = resp.post {
                print_post(&post);
            }
        }
        Command::FetchAll => {
            let resp = client
                .read_all(ReadAllRequest {})
                .await
                .context("ReadAll failed")?
                .into_inner();
            check_error(&resp.error)?;
            for post in &resp.posts {
                print_post(post);
            }
        }
        Command::Update(request) => {
            let resp = client
                .update_post(request)
                .await
                .context("UpdatePost failed")?
                .into_inner();
            check_error(&resp.error)?;
            if let Some(post) = resp.post {
                print_post(&post);
            }
        }
        Command::Delete(request) => {
            let post_id = request.post_id.clone();
            let resp = client
                .delete_post(request)
                .await
                .context("DeletePost failed")?
                .into_inner();
            check_error(&resp.error)?;
            println!("Deleted {}", post_id);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args: Vec<String> = env::args().collect();
    let Some((endpoint, command)) = args
        .get(1)
        .zip(args.get(2..).and_then(parse_command))
    else {
        eprintln!("Invalid arguments");
        usage();
        return Ok(ExitCode::FAILURE);
    };

    let tracing_config = TracingConfig::from_env().context("Failed to load tracing configuration")?;
    init_tracing("blog-client", "warn,blog_client=info", LogFormat::Pretty, &tracing_config)?;

    let span = tracing::info_span!("blog_client", command = command.name(), endpoint = %endpoint);
    let result = run(endpoint, command).instrument(span).await;

    shutdown_tracing();
    result.map(|()| ExitCode::SUCCESS)
}
