// Integration tests for the Blog Service gRPC API
//
// Each test starts an in-process tonic server on an ephemeral port with the
// same layer stack as the binary, then talks to it through the generated
// client.

use std::net::SocketAddr;
use std::sync::Arc;

use blog_service::events::{MemoryEventSink, PostEvent};
use blog_service::grpc::blog::blog_service_client::BlogServiceClient;
use blog_service::grpc::blog::blog_service_server::BlogServiceServer;
use blog_service::grpc::blog::*;
use blog_service::grpc::{BlogServiceImpl, RequestLoggingLayer};
use blog_service::services::PostStore;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::{Channel, Server};

struct TestServer {
    client: BlogServiceClient<Channel>,
    events: MemoryEventSink,
}

async fn start_server() -> TestServer {
    let events = MemoryEventSink::new();
    let store = Arc::new(PostStore::new(Arc::new(events.clone())));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind gRPC port");
    let addr: SocketAddr = listener.local_addr().expect("local addr");
    let incoming = TcpListenerStream::new(listener);

    tokio::spawn(async move {
        Server::builder()
            .layer(RequestLoggingLayer)
            .add_service(BlogServiceServer::new(BlogServiceImpl::new(store)))
            .serve_with_incoming(incoming)
            .await
            .expect("start blog-service");
    });

    let client = BlogServiceClient::connect(format!("http://{}", addr))
        .await
        .expect("connect to blog-service");

    TestServer { client, events }
}

fn create_request(title: &str) -> CreatePostRequest {
    CreatePostRequest {
        title: title.to_string(),
        content: "content".to_string(),
        author: "author".to_string(),
        publication_date: None,
        tags: vec!["grpc".to_string()],
    }
}

#[tokio::test]
async fn test_create_post_assigns_id() {
    let TestServer { mut client, events } = start_server().await;

    let resp = client
        .create_post(create_request("test"))
        .await
        .expect("CreatePost failed")
        .into_inner();

    assert!(resp.error.is_empty());
    let post = resp.post.expect("expected post in response");
    assert!(!post.post_id.is_empty());
    assert!(events.events().contains(&PostEvent::Created {
        post_id: post.post_id.clone(),
        author: "author".to_string(),
    }));
}

#[tokio::test]
async fn test_read_post_not_found_is_reported_in_response() {
    let TestServer { mut client, .. } = start_server().await;

    let resp = client
        .read_post(ReadPostRequest {
            post_id: "missing".to_string(),
        })
        .await
        .expect("ReadPost must succeed at the transport level")
        .into_inner();

    assert!(resp.post.is_none());
    assert!(!resp.error.is_empty());
}

#[tokio::test]
async fn test_delete_missing_post_is_reported_in_response() {
    let TestServer { mut client, .. } = start_server().await;

    let resp = client
        .delete_post(DeletePostRequest {
            post_id: "missing".to_string(),
        })
        .await
        .expect("DeletePost must succeed at the transport level")
        .into_inner();

    assert!(!resp.success);
    assert!(!resp.error.is_empty());
}

#[tokio::test]
async fn test_post_lifecycle() {
    let TestServer { mut client, .. } = start_server().await;

    let created = client
        .create_post(create_request("A"))
        .await
        .unwrap()
        .into_inner()
        .post
        .unwrap();
    let id = created.post_id.clone();

    let read = client
        .read_post(ReadPostRequest {
            post_id: id.clone(),
        })
        .await
        .unwrap()
        .into_inner()
        .post
        .unwrap();
    assert_eq!(read, created);

    let updated = client
        .update_post(UpdatePostRequest {
            post_id: id.clone(),
            title: "B".to_string(),
            ..Default::default()
        })
        .await
        .unwrap()
        .into_inner();
    assert!(updated.error.is_empty());
    let updated = updated.post.unwrap();
    assert_eq!(updated.post_id, id);
    assert_eq!(updated.title, "B");

    let deleted = client
        .delete_post(DeletePostRequest {
            post_id: id.clone(),
        })
        .await
        .unwrap()
        .into_inner();
    assert!(deleted.success);

    let gone = client
        .read_post(ReadPostRequest { post_id: id })
        .await
        .unwrap()
        .into_inner();
    assert!(gone.post.is_none());
    assert!(!gone.error.is_empty());
}

#[tokio::test]
async fn test_read_all_returns_every_post() {
    let TestServer { mut client, events } = start_server().await;

    let empty = client.read_all(ReadAllRequest {}).await.unwrap().into_inner();
    assert!(empty.posts.is_empty());

    for i in 0..3 {
        client
            .create_post(create_request(&format!("post-{i}")))
            .await
            .unwrap();
    }

    let all = client.read_all(ReadAllRequest {}).await.unwrap().into_inner();
    assert_eq!(all.posts.len(), 3);
    assert!(all.error.is_empty());

    let reads = events
        .events()
        .iter()
        .filter(|event| event.action() == "read")
        .count();
    assert_eq!(reads, 3);
}
