//! End-to-end tests of the function clients against a mock backend.

use futures::StreamExt;
use serde_json::{Value, json};
use showcase_core::chat::{ChatMessage, ChatTransport};
use showcase_core::config::ChatSettings;
use showcase_core::error::ShowcaseError;
use showcase_interaction::{
    FunctionsChatTransport, ImageGenerator, PromptTemplate, TextGenerator,
    oneshot_client_builder, streaming_client_builder,
};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn local_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

fn event_stream(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_raw(body.to_string(), "text/event-stream")
}

async fn mount(server: &MockServer, function: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(format!("/functions/v1/{function}")))
        .and(header("authorization", "Bearer anon-key"))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

async fn only_request_body(server: &MockServer) -> Value {
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    serde_json::from_slice(&requests[0].body).unwrap()
}

#[tokio::test]
async fn test_chat_stream_yields_fragments_in_order() {
    let server = MockServer::start().await;
    mount(
        &server,
        "chat",
        event_stream(concat!(
            ": keep-alive\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n",
            "\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\r\n",
            "data: [DONE]\n",
        )),
    )
    .await;

    let transport =
        FunctionsChatTransport::new(format!("{}/functions/v1/chat", server.uri()), "anon-key")
            .with_client(local_client());
    let context = vec![ChatMessage::user("Say hello")];

    let stream = transport.open_stream(&context).await.unwrap();
    let fragments: Vec<String> = stream.map(|item| item.unwrap()).collect().await;

    assert_eq!(fragments, vec!["Hel", "lo"]);
    assert_eq!(
        only_request_body(&server).await,
        json!({ "messages": [{ "role": "user", "content": "Say hello" }] })
    );
}

#[tokio::test]
async fn test_chat_rate_limit_maps_to_distinct_error() {
    let server = MockServer::start().await;
    mount(
        &server,
        "chat",
        ResponseTemplate::new(429)
            .set_body_json(json!({ "error": "Rate limits exceeded, please try again later." })),
    )
    .await;

    let transport =
        FunctionsChatTransport::new(format!("{}/functions/v1/chat", server.uri()), "anon-key")
            .with_client(local_client());

    let err = match transport.open_stream(&[ChatMessage::user("hi")]).await {
        Ok(_) => panic!("expected a rate-limit failure"),
        Err(err) => err,
    };

    assert_eq!(err, ShowcaseError::RateLimited);
    assert_eq!(
        err.user_message(),
        "Rate limit exceeded. Please try again later."
    );
}

#[tokio::test]
async fn test_chat_server_error_is_generic_failure() {
    let server = MockServer::start().await;
    mount(&server, "chat", ResponseTemplate::new(503)).await;

    let transport =
        FunctionsChatTransport::new(format!("{}/functions/v1/chat", server.uri()), "anon-key")
            .with_client(local_client());

    let err = match transport.open_stream(&[ChatMessage::user("hi")]).await {
        Ok(_) => panic!("expected an HTTP failure"),
        Err(err) => err,
    };

    assert!(matches!(err, ShowcaseError::Http { status: 503, .. }));
    assert_eq!(err.user_message(), "Failed to get response");
}

#[tokio::test]
async fn test_generate_text_round_trip() {
    let server = MockServer::start().await;
    mount(
        &server,
        "generate-text",
        ResponseTemplate::new(200).set_body_json(json!({ "text": "Roses are red" })),
    )
    .await;

    let generator =
        TextGenerator::new(format!("{}/functions/v1/generate-text", server.uri()), "anon-key")
            .with_client(local_client());

    let text = generator
        .generate(PromptTemplate::Poem, "roses")
        .await
        .unwrap();

    assert_eq!(text, "Roses are red");
    assert_eq!(
        only_request_body(&server).await,
        json!({ "prompt": "Write a beautiful poem about roses" })
    );
}

#[tokio::test]
async fn test_generate_text_quota_exhausted() {
    let server = MockServer::start().await;
    mount(
        &server,
        "generate-text",
        ResponseTemplate::new(402).set_body_json(json!({ "error": "Payment required" })),
    )
    .await;

    let generator =
        TextGenerator::new(format!("{}/functions/v1/generate-text", server.uri()), "anon-key")
            .with_client(local_client());

    let err = generator
        .generate(PromptTemplate::Custom, "anything")
        .await
        .unwrap_err();

    assert_eq!(err, ShowcaseError::QuotaExhausted);
}

#[tokio::test]
async fn test_generate_image_returns_url() {
    let server = MockServer::start().await;
    mount(
        &server,
        "generate-image",
        ResponseTemplate::new(200)
            .set_body_json(json!({ "imageUrl": "https://cdn.example.co/cabin.png" })),
    )
    .await;

    let generator =
        ImageGenerator::new(format!("{}/functions/v1/generate-image", server.uri()), "anon-key")
            .with_client(local_client());

    let url = generator
        .generate("Cozy cabin in snowy mountains")
        .await
        .unwrap();

    assert_eq!(url, "https://cdn.example.co/cabin.png");
    assert_eq!(
        only_request_body(&server).await,
        json!({ "prompt": "Cozy cabin in snowy mountains" })
    );
}

#[tokio::test]
async fn test_generate_image_rate_limited() {
    let server = MockServer::start().await;
    mount(&server, "generate-image", ResponseTemplate::new(429)).await;

    let generator =
        ImageGenerator::new(format!("{}/functions/v1/generate-image", server.uri()), "anon-key")
            .with_client(local_client());

    let err = generator.generate("anything").await.unwrap_err();

    assert_eq!(err, ShowcaseError::RateLimited);
}

#[tokio::test]
async fn test_blank_image_prompt_sends_nothing() {
    let server = MockServer::start().await;
    let generator =
        ImageGenerator::new(format!("{}/functions/v1/generate-image", server.uri()), "anon-key")
            .with_client(local_client());

    let err = generator.generate("   ").await.unwrap_err();

    assert_eq!(
        err,
        ShowcaseError::InvalidInput("Please enter a description".to_string())
    );
    assert!(server.received_requests().await.unwrap().is_empty());
}

fn tight_timeouts() -> ChatSettings {
    ChatSettings {
        request_timeout_secs: 1,
        stream_idle_timeout_secs: 5,
        ..ChatSettings::default()
    }
}

#[tokio::test]
async fn test_slow_stream_outlives_request_timeout() {
    let server = MockServer::start().await;
    mount(
        &server,
        "chat",
        event_stream("data: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\ndata: [DONE]\n")
            .set_delay(Duration::from_millis(1500)),
    )
    .await;

    let client = streaming_client_builder(&tight_timeouts())
        .no_proxy()
        .build()
        .unwrap();
    let transport =
        FunctionsChatTransport::new(format!("{}/functions/v1/chat", server.uri()), "anon-key")
            .with_client(client);

    let stream = transport.open_stream(&[ChatMessage::user("hi")]).await.unwrap();
    let fragments: Vec<String> = stream.map(|item| item.unwrap()).collect().await;

    assert_eq!(fragments, vec!["late"]);
}

#[tokio::test]
async fn test_oneshot_call_is_bounded_by_request_timeout() {
    let server = MockServer::start().await;
    mount(
        &server,
        "generate-text",
        ResponseTemplate::new(200)
            .set_body_json(json!({ "text": "too late" }))
            .set_delay(Duration::from_millis(1500)),
    )
    .await;

    let client = oneshot_client_builder(&tight_timeouts())
        .no_proxy()
        .build()
        .unwrap();
    let generator =
        TextGenerator::new(format!("{}/functions/v1/generate-text", server.uri()), "anon-key")
            .with_client(client);

    let err = generator
        .generate(PromptTemplate::Custom, "anything")
        .await
        .unwrap_err();

    assert!(err.is_transport_failure());
}
