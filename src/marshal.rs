//! Request marshaling: envelope → typed arguments → operation → XML.

use crate::error::{soap_fault_fragment, xml_escape, DispatchError, FaultCode, ServerError, SoapFault};
use crate::service::{Arguments, Operation, Service};
use crate::types::{Kind, TypeDescriptor};
use crate::xml::{local_name, prefix_of, XmlElement, XmlNode};
use serde_json::{Map, Number, Value};
use tracing::debug;

/// SOAP envelope namespace used in responses.
pub const RESPONSE_ENVELOPE_NS: &str = "http://www.w3.org/2001/12/soap-envelope";
/// SOAP encoding style used in responses.
pub const RESPONSE_ENCODING_STYLE: &str = "http://www.w3.org/2001/12/soap-encoding";

/// A located operation call, arguments already cast.
#[derive(Debug)]
pub struct Call<'a> {
    pub operation: &'a Operation,
    pub arguments: Arguments,
}

/// Result of a successful dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    pub operation_name: String,
    /// `{ <op>Response: { <op>Result: result } }`
    pub result: Value,
}

/// Cast a raw request node against its descriptor.
pub fn cast_argument(path: &str, raw: &XmlNode, descriptor: &TypeDescriptor) -> Result<Value, SoapFault> {
    match descriptor {
        TypeDescriptor::Object(object) => {
            let element = match raw {
                XmlNode::Element(element) => element,
                // <obj/> or blank content is an empty structure, any other text is a scalar
                XmlNode::Text(text) if text.trim().is_empty() => {
                    return Ok(Value::Object(object.instantiate()))
                }
                XmlNode::Text(_) => {
                    return Err(SoapFault::invalid_input_type(path, raw.shape(), &object.type_name))
                }
            };

            let mut instance = object.instantiate();
            for (key, nodes) in element.children() {
                let Some(node) = nodes.first() else {
                    continue;
                };
                let member = local_name(key);
                let value = match object.member(member) {
                    Some(member_descriptor) => {
                        cast_argument(&format!("{}.{}", path, member), node, member_descriptor)?
                    }
                    None => Value::String(node.text().unwrap_or_default().to_string()),
                };
                instance.insert(member.to_string(), value);
            }
            Ok(Value::Object(instance))
        }

        TypeDescriptor::Primitive(kind) => {
            if raw.has_children() {
                return Err(SoapFault::invalid_input_type(path, raw.shape(), kind.as_str()));
            }
            let text = raw.text().unwrap_or_default();

            match kind {
                Kind::Number => cast_number(text)
                    .ok_or_else(|| SoapFault::invalid_input_type(path, "string", kind.as_str())),
                Kind::Boolean => Ok(Value::Bool(is_truthy(text))),
                Kind::String => Ok(Value::String(text.to_string())),
            }
        }
    }
}

/// Parse a number whose canonical text is exactly `text`.
fn cast_number(text: &str) -> Option<Value> {
    let parsed: f64 = text.parse().ok()?;
    if format_number(parsed) != text {
        return None;
    }
    if parsed.fract() == 0.0 && parsed.abs() < i64::MAX as f64 {
        return Some(Value::Number(Number::from(parsed as i64)));
    }
    Number::from_f64(parsed).map(Value::Number)
}

/// Canonical text of a number: integral values have no fraction, `-0` is `0`,
/// and magnitudes from `1e21` up or below `1e-6` use exponent form (`1e+21`, `1.5e-7`).
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }

    let magnitude = value.abs();
    if magnitude.is_finite() && (magnitude >= 1e21 || magnitude < 1e-6) {
        let text = format!("{:e}", value);
        return match text.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => text,
        };
    }
    value.to_string()
}

fn is_truthy(text: &str) -> bool {
    !(text.is_empty() || text == "0" || text.eq_ignore_ascii_case("false"))
}

/// Text form of a scalar value. Null renders empty.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => n.as_f64().map(format_number).unwrap_or_else(|| n.to_string()),
        },
        other => other.to_string(),
    }
}

/// Locate the operation and cast its arguments.
pub fn extract_call<'a>(service: &'a Service, document: &XmlElement) -> Result<Call<'a>, DispatchError> {
    let (_, envelope) = document
        .find_local("Envelope")
        .ok_or_else(|| ServerError::MalformedEnvelope("no Envelope element".to_string()))?;
    let (_, body) = envelope
        .as_element()
        .and_then(|e| e.find_local("Body"))
        .ok_or_else(|| ServerError::MalformedEnvelope("no Body element".to_string()))?;

    let (request_name, request) = body
        .as_element()
        .and_then(|b| b.children().next())
        .and_then(|(name, nodes)| nodes.first().map(|node| (name, node)))
        .ok_or_else(SoapFault::operation_not_specified)?;

    let operation_name = local_name(request_name);
    let operation = service
        .get_operation(operation_name)
        .ok_or_else(|| SoapFault::operation_not_found(operation_name))?;

    let arguments = match request.as_element() {
        Some(request) => bind_arguments(operation, request)?,
        None => bind_arguments(operation, &XmlElement::default())?,
    };

    Ok(Call {
        operation,
        arguments,
    })
}

/// Bind declared inputs, in order, from the request element.
///
/// Every argument is assumed to share the prefix of the first argument key.
fn bind_arguments(operation: &Operation, request: &XmlElement) -> Result<Arguments, SoapFault> {
    let prefix = request.keys().next().map(prefix_of).unwrap_or("");

    let mut arguments = Vec::with_capacity(operation.inputs().len());
    for input in operation.inputs() {
        let key = format!("{}{}", prefix, input.name);
        match request.first(&key) {
            Some(node) => arguments.push(cast_argument(&input.name, node, &input.descriptor)?),
            None if input.required => return Err(SoapFault::missing_required_input(&input.name)),
            None => arguments.push(Value::Null),
        }
    }
    Ok(Arguments::new(arguments))
}

/// Dispatch a parsed envelope to its operation and wrap the result.
pub async fn dispatch(service: &Service, document: &XmlElement) -> Result<Dispatched, DispatchError> {
    let Call {
        operation,
        arguments,
    } = extract_call(service, document)?;

    debug!(
        service = %service.name(),
        operation = %operation.name(),
        argument_count = arguments.len(),
        "Invoking operation"
    );

    let result = operation.invoke(arguments).resolve().await?;

    let name = operation.name();
    let mut inner = Map::new();
    inner.insert(format!("{}Result", name), result);
    let mut outer = Map::new();
    outer.insert(format!("{}Response", name), Value::Object(inner));

    Ok(Dispatched {
        operation_name: name.to_string(),
        result: Value::Object(outer),
    })
}

/// Render a value tree as indented XML elements.
///
/// Objects recurse one level deeper, scalars become one-line elements and
/// arrays repeat the element once per item.
pub fn serialize(value: &Value, namespace: Option<&str>, indent_level: usize) -> String {
    let mut out = String::new();
    if let Value::Object(map) = value {
        for (name, child) in map {
            write_element(&mut out, name, child, namespace, indent_level);
        }
    }
    out
}

fn write_element(out: &mut String, name: &str, value: &Value, namespace: Option<&str>, indent_level: usize) {
    let indent = "\t".repeat(indent_level);
    let element = match namespace {
        Some(ns) => format!("{}:{}", ns, name),
        None => name.to_string(),
    };

    match value {
        Value::Object(_) => {
            out.push_str(&format!("{}<{}>\n", indent, element));
            out.push_str(&serialize(value, namespace, indent_level + 1));
            out.push_str(&format!("{}</{}>\n", indent, element));
        }
        Value::Array(items) => {
            for item in items {
                write_element(out, name, item, namespace, indent_level);
            }
        }
        scalar => {
            out.push_str(&format!(
                "{}<{}>{}</{}>\n",
                indent,
                element,
                xml_escape(&scalar_text(scalar)),
                element
            ));
        }
    }
}

/// Wrap a body fragment in the response envelope.
pub fn response_envelope(body: &str) -> String {
    format!(
        "<soap:Envelope\n\
         \txmlns:soap=\"{RESPONSE_ENVELOPE_NS}\"\n\
         \tsoap:encodingStyle=\"{RESPONSE_ENCODING_STYLE}\">\n\
         \t<soap:Body>\n\
         {body}\
         \t</soap:Body>\n\
         </soap:Envelope>"
    )
}

/// A rendered response envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    /// Operation that produced a result (absent on fault)
    pub operation: Option<String>,
    /// Fault code when the envelope carries a SOAP Fault
    pub fault: Option<FaultCode>,
    pub envelope: String,
}

/// Dispatch and render the full response envelope.
///
/// Service faults become a SOAP Fault in the envelope; server errors are returned.
pub async fn respond(service: &Service, document: &XmlElement) -> Result<Rendered, ServerError> {
    match dispatch(service, document).await {
        Ok(dispatched) => {
            let body = serialize(&dispatched.result, None, 2);
            Ok(Rendered {
                operation: Some(dispatched.operation_name),
                fault: None,
                envelope: response_envelope(&body),
            })
        }
        Err(DispatchError::Service(fault)) => {
            debug!(
                service = %service.name(),
                code = %fault.code.as_str(),
                message = %fault.message,
                "Operation fault"
            );
            Ok(Rendered {
                operation: None,
                fault: Some(fault.code),
                envelope: response_envelope(&soap_fault_fragment(&fault, 2)),
            })
        }
        Err(DispatchError::Server(error)) => Err(error),
    }
}
