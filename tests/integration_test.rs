//! Integration tests for the zentinel-soap-server crate.
//!
//! These tests exercise the public API surface end-to-end: service
//! registration, envelope dispatch, WSDL generation and the HTTP router.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use std::sync::Arc;
use tower::ServiceExt;
use zentinel_soap_server::config::SettingsConfig;
use zentinel_soap_server::demo::{test_service, MyObject};
use zentinel_soap_server::marshal::respond;
use zentinel_soap_server::reflect::TypeHint;
use zentinel_soap_server::server::ReplyKind;
use zentinel_soap_server::xml::parse_document;
use zentinel_soap_server::{
    Arguments, FaultCode, ServiceBuilder, SoapFault, SoapServer, SoapServerConfig,
};

// ============================================================================
// Helpers
// ============================================================================

fn add_service(kind: &str) -> zentinel_soap_server::Service {
    let mut builder = ServiceBuilder::new("calc", ());
    let operation = builder.operation("add", |_: &(), args: Arguments| {
        let a = args.value(0).cloned().unwrap_or_default();
        let b = args.value(1).cloned().unwrap_or_default();
        match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => Ok(serde_json::json!(a + b)),
            _ => Ok(serde_json::json!(args.text(0) + &args.text(1))),
        }
    });
    operation.signature("(a, b)");
    if kind == "number" {
        operation
            .set_input_type("a", "number")
            .set_input_type("b", "number")
            .set_output_type("number");
    }
    builder.build()
}

fn server_with(services: Vec<zentinel_soap_server::Service>, config: SoapServerConfig) -> Router {
    let mut server = SoapServer::new(config);
    for service in services {
        server.add_service(service);
    }
    Arc::new(server).router()
}

fn demo_router() -> Router {
    server_with(vec![test_service().build()], SoapServerConfig::default())
}

fn envelope(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:ex="urn:examples:testService">
  <soapenv:Header/>
  <soapenv:Body>
    {}
  </soapenv:Body>
</soapenv:Envelope>"#,
        body
    )
}

async fn post(router: Router, path: &str, body: String) -> (StatusCode, String) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, "text/xml")
        .body(Body::from(body))
        .unwrap();
    send(router, request).await
}

async fn get(router: Router, path: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method(Method::GET)
        .uri(path)
        .header(header::HOST, "soap.example.org:8080")
        .body(Body::empty())
        .unwrap();
    send(router, request).await
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

// ============================================================================
// Dispatch through the public API
// ============================================================================

#[tokio::test]
async fn test_untyped_inputs_concatenate() {
    let service = add_service("string");
    let xml = envelope("<ex:add><ex:a>2</ex:a><ex:b>3</ex:b></ex:add>");
    let document = parse_document(xml.as_bytes(), &Default::default()).unwrap();

    let rendered = respond(&service, &document).await.unwrap();
    assert_eq!(rendered.operation.as_deref(), Some("add"));
    assert!(rendered.envelope.contains("<addResult>23</addResult>"));
}

#[tokio::test]
async fn test_number_inputs_add() {
    let service = add_service("number");
    let xml = envelope("<ex:add><ex:a>2</ex:a><ex:b>3</ex:b></ex:add>");
    let document = parse_document(xml.as_bytes(), &Default::default()).unwrap();

    let rendered = respond(&service, &document).await.unwrap();
    assert!(rendered.envelope.contains("<addResult>5</addResult>"));
    assert!(rendered
        .envelope
        .contains("xmlns:soap=\"http://www.w3.org/2001/12/soap-envelope\""));
}

#[tokio::test]
async fn test_declared_fault_is_rendered_in_envelope() {
    let mut builder = ServiceBuilder::new("bank", ());
    builder
        .operation("withdraw", |_: &(), _args: Arguments| -> Result<(), SoapFault> {
            Err(SoapFault::declared("InsufficientFunds", "Balance too low"))
        })
        .signature("(amount)")
        .add_fault("InsufficientFunds");
    let service = builder.build();

    let xml = envelope("<ex:withdraw><ex:amount>10</ex:amount></ex:withdraw>");
    let document = parse_document(xml.as_bytes(), &Default::default()).unwrap();
    let rendered = respond(&service, &document).await.unwrap();

    assert_eq!(rendered.fault, Some(FaultCode::OperationFault));
    assert!(rendered.envelope.contains("<soap:faultstring>Balance too low</soap:faultstring>"));
    assert!(rendered.envelope.contains("<InsufficientFunds></InsufficientFunds>"));
}

// ============================================================================
// HTTP: operations
// ============================================================================

#[tokio::test]
async fn test_http_sync_operation() {
    let (status, body) = post(demo_router(), "/testService", envelope("<ex:test5/>")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<test5Response>"));
    assert!(body.contains("<test5Result>000-000-000</test5Result>"));
}

#[tokio::test]
async fn test_http_async_operation() {
    let xml = envelope("<ex:test1><ex:myArg1>2</ex:myArg1><ex:myArg2>3</ex:myArg2></ex:test1>");
    let (status, body) = post(demo_router(), "/testService", xml).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<test1Result>23</test1Result>"));

    let xml = envelope("<ex:test2><ex:myArg1>2</ex:myArg1><ex:myArg2>3</ex:myArg2></ex:test2>");
    let (_, body) = post(demo_router(), "/testService", xml).await;
    assert!(body.contains("<test2Result>5</test2Result>"));
}

#[tokio::test]
async fn test_http_object_output() {
    let xml = envelope("<ex:test3><ex:strArg>x</ex:strArg><ex:intArg>41</ex:intArg></ex:test3>");
    let (status, body) = post(demo_router(), "/testService", xml).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<concated>x[41]</concated>"));
    assert!(body.contains("<incremented>42</incremented>"));
}

#[tokio::test]
async fn test_http_object_input() {
    let xml = envelope(
        "<ex:test4><ex:myTestObjectInstance>\
         <ex:strArg>abc</ex:strArg><ex:intArg>7</ex:intArg>\
         </ex:myTestObjectInstance></ex:test4>",
    );
    let (status, body) = post(demo_router(), "/testService", xml).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<test4Result>abc[7]</test4Result>"));
}

#[tokio::test]
async fn test_http_fault_is_ok_status() {
    let xml = envelope("<ex:test2><ex:myArg1>two</ex:myArg1><ex:myArg2>3</ex:myArg2></ex:test2>");
    let (status, body) = post(demo_router(), "/testService", xml).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<soap:faultcode>INVALID_INPUT_TYPE</soap:faultcode>"));
    assert!(body.contains("<InvalidInputType></InvalidInputType>"));
}

#[tokio::test]
async fn test_http_argument_text_is_not_trimmed() {
    let xml = envelope(
        "<ex:test1>\n      <ex:myArg1>  two </ex:myArg1>\n      <ex:myArg2> words  </ex:myArg2>\n    </ex:test1>",
    );
    let (_, body) = post(demo_router(), "/testService", xml).await;
    assert!(body.contains("<test1Result>  two  words  </test1Result>"));

    let xml = envelope("<ex:test2><ex:myArg1> 7</ex:myArg1><ex:myArg2>3</ex:myArg2></ex:test2>");
    let (status, body) = post(demo_router(), "/testService", xml).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<soap:faultcode>INVALID_INPUT_TYPE</soap:faultcode>"));
}

#[tokio::test]
async fn test_http_missing_input_fault() {
    let xml = envelope("<ex:test1><ex:myArg1>2</ex:myArg1></ex:test1>");
    let (status, body) = post(demo_router(), "/testService", xml).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("MISSING_REQUIRED_INPUT"));
}

#[tokio::test]
async fn test_http_unknown_operation_fault() {
    let (status, body) = post(demo_router(), "/testService", envelope("<ex:test9/>")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<soap:faultcode>OPERATION_NOT_FOUND</soap:faultcode>"));
}

#[tokio::test]
async fn test_http_unknown_service() {
    let (status, body) = post(demo_router(), "/otherService", envelope("<ex:test5/>")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("otherService"));
}

#[tokio::test]
async fn test_http_doctype_rejected() {
    let xml = format!(
        "<!DOCTYPE foo [<!ENTITY xxe SYSTEM \"file:///etc/passwd\">]>{}",
        envelope("<ex:test5/>").replace("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n", "")
    );
    let (status, _) = post(demo_router(), "/testService", xml).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_http_debug_headers() {
    let config = SoapServerConfig {
        settings: SettingsConfig {
            debug_headers: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let router = server_with(vec![test_service().build()], config);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/testService")
        .body(Body::from(envelope("<ex:test5/>")))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.headers().get("x-soap-service").unwrap(), "testService");
    assert_eq!(response.headers().get("x-soap-operation").unwrap(), "test5");
    assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "text/xml");
}

// ============================================================================
// HTTP: WSDL
// ============================================================================

#[tokio::test]
async fn test_http_wsdl() {
    let (status, wsdl) = get(demo_router(), "/testService?wsdl").await;
    assert_eq!(status, StatusCode::OK);

    assert!(wsdl.starts_with("<?xml version=\"1.0\" ?>"));
    assert!(wsdl.contains("name=\"testService\""));
    assert!(wsdl.contains("<soap:address location=\"http://soap.example.org:8080/testService\" />"));
    assert!(wsdl.contains("namespace=\"urn:examples:testService\""));

    // One complexType per object type
    assert_eq!(wsdl.matches("<xsd:complexType name=\"MyObject\">").count(), 1);
    assert_eq!(wsdl.matches("<xsd:complexType name=\"MyTestObject\">").count(), 1);

    // Declared faults only
    assert!(wsdl.contains("<message name=\"test2Fault\">"));
    assert!(!wsdl.contains("<message name=\"test1Fault\">"));

    for op in ["test1", "test2", "test3", "test4", "test5"] {
        assert!(wsdl.contains(&format!("<operation name=\"{}\">", op)));
    }
}

#[tokio::test]
async fn test_http_wsdl_is_parseable() {
    let (_, wsdl) = get(demo_router(), "/testService?wsdl").await;
    let document = parse_document(wsdl.as_bytes(), &Default::default()).unwrap();
    assert!(document.child("definitions").is_some());
}

#[tokio::test]
async fn test_http_get_without_query() {
    let (status, _) = get(demo_router(), "/testService").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_http_get_unknown_service() {
    let (status, _) = get(demo_router(), "/nothing?wsdl").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_http_nested_path_not_found() {
    let (status, _) = get(demo_router(), "/testService/deeper?wsdl").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Registry
// ============================================================================

#[tokio::test]
async fn test_server_registry_and_stats() {
    let mut builder = ServiceBuilder::new("typed", ());
    builder
        .operation("make", |_: &(), args: Arguments| {
            Ok(MyObject {
                concated: args.text(0),
                incremented: 1.0,
            })
        })
        .signature("(label)")
        .set_output_type(TypeHint::of::<MyObject>());

    let mut server = SoapServer::new(SoapServerConfig::default());
    server
        .add_service(test_service().build())
        .add_service(builder.build());

    let names: Vec<&str> = server.services().map(|s| s.name()).collect();
    assert_eq!(names, vec!["testService", "typed"]);

    let uri = "/typed".parse().unwrap();
    let xml = envelope("<ex:make><ex:label>hi</ex:label></ex:make>");
    let reply = server
        .handle_request(&Method::POST, &uri, None, xml.as_bytes())
        .await
        .unwrap();
    assert_eq!(reply.kind, ReplyKind::Result { operation: "make".to_string() });
    assert!(reply.body.contains("<concated>hi</concated>"));
    assert_eq!(server.stats().requests_processed, 1);

    let wsdl = server
        .wsdl(server.service("typed").unwrap(), "localhost")
        .unwrap();
    assert_eq!(wsdl.matches("<xsd:complexType name=\"MyObject\">").count(), 1);
}
