//! WSDL/XSD generation.
//!
//! The output is fixed text: every operation, message and type is emitted in
//! registration order, RPC style with encoded bodies.

use crate::service::{Operation, Service};
use crate::types::{ObjectType, TypeDescriptor};
use std::fmt::{self, Write};

pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";
pub const WSDL_SOAP_NS: &str = "http://schemas.xmlsoap.org/wsdl/soap/";
pub const WSDL_NS: &str = "http://schemas.xmlsoap.org/wsdl/";
pub const SOAP_HTTP_TRANSPORT: &str = "http://schemas.xmlsoap.org/soap/http";
pub const SOAP_ENCODING_NS: &str = "http://schemas.xmlsoap.org/soap/encoding/";

/// Settings for one WSDL document.
#[derive(Debug, Clone)]
pub struct WsdlOptions<'a> {
    /// Host (and port) the service is reached at
    pub host: &'a str,
    /// Target namespace host, rendered as `http://<host>/`
    pub target_namespace: &'a str,
    /// Prefix of the per-service body namespace (`urn:examples:` by default)
    pub binding_namespace_prefix: &'a str,
}

impl<'a> WsdlOptions<'a> {
    pub fn new(host: &'a str, target_namespace: &'a str) -> Self {
        Self {
            host,
            target_namespace,
            binding_namespace_prefix: "urn:examples:",
        }
    }
}

/// Synthesize the WSDL document for a service.
pub fn synthesize(service: &Service, options: &WsdlOptions<'_>) -> Result<String, fmt::Error> {
    let mut wsdl = String::new();
    write_wsdl(&mut wsdl, service, options)?;
    Ok(wsdl)
}

/// Write the WSDL document for a service into `out`.
pub fn write_wsdl<W: Write>(out: &mut W, service: &Service, options: &WsdlOptions<'_>) -> fmt::Result {
    let tns = format!("http://{}/", options.target_namespace);
    let name = service.name();

    writeln!(out, "<?xml version=\"1.0\" ?>")?;
    writeln!(out, "\t<definitions")?;
    writeln!(out, "\txmlns:tns=\"{}\"", tns)?;
    writeln!(out, "\txmlns:xsd=\"{}\"", XSD_NS)?;
    writeln!(out, "\txmlns:soap=\"{}\"", WSDL_SOAP_NS)?;
    writeln!(out, "\txmlns=\"{}\"", WSDL_NS)?;
    writeln!(out, "\ttargetNamespace=\"{}\"", tns)?;
    writeln!(out, "\tname=\"{}\">", name)?;

    write_types(out, service, &tns)?;

    for operation in service.operations() {
        write_messages(out, operation)?;
    }

    write_port_type(out, service)?;
    write_binding(out, service, options)?;

    writeln!(out, "\t<service name=\"{}\">", name)?;
    writeln!(out, "\t\t<port name=\"{name}_Port\" binding=\"tns:{name}_Binding\">")?;
    writeln!(
        out,
        "\t\t\t<soap:address location=\"http://{}/{}\" />",
        options.host, name
    )?;
    writeln!(out, "\t\t</port>")?;
    writeln!(out, "\t</service>")?;
    write!(out, "</definitions>")
}

fn write_types<W: Write>(out: &mut W, service: &Service, tns: &str) -> fmt::Result {
    writeln!(out, "\t<types>")?;
    writeln!(
        out,
        "\t\t<xsd:schema version=\"1.0\" targetNamespace=\"{}\">",
        tns
    )?;

    for (type_name, object) in service.collect_object_types() {
        writeln!(
            out,
            "\t\t\t<xsd:element name=\"{type_name}\" type=\"tns:{type_name}\" />"
        )?;
        writeln!(out, "\t\t\t<xsd:complexType name=\"{}\">", type_name)?;
        writeln!(out, "\t\t\t\t<xsd:sequence>")?;
        write_members(out, &object, 5)?;
        writeln!(out, "\t\t\t\t</xsd:sequence>")?;
        writeln!(out, "\t\t\t</xsd:complexType>")?;
    }

    writeln!(out, "\t\t</xsd:schema>")?;
    writeln!(out, "\t</types>")
}

fn write_members<W: Write>(out: &mut W, object: &ObjectType, indent_level: usize) -> fmt::Result {
    for member in &object.members {
        write_element(out, &member.name, &member.descriptor, indent_level)?;
    }
    Ok(())
}

/// One XSD element; object members inline an anonymous complex type.
fn write_element<W: Write>(
    out: &mut W,
    name: &str,
    descriptor: &TypeDescriptor,
    indent_level: usize,
) -> fmt::Result {
    let indent = "\t".repeat(indent_level);

    match descriptor {
        TypeDescriptor::Primitive(kind) => writeln!(
            out,
            "{}<xsd:element name=\"{}\" type=\"xsd:{}\" minOccurs=\"0\" />",
            indent,
            name,
            kind.xsd_name()
        ),
        TypeDescriptor::Object(object) => {
            writeln!(out, "{}<xsd:element name=\"{}\" minOccurs=\"0\">", indent, name)?;
            writeln!(out, "{}\t<xsd:complexType>", indent)?;
            writeln!(out, "{}\t\t<xsd:sequence>", indent)?;
            write_members(out, object, indent_level + 3)?;
            writeln!(out, "{}\t\t</xsd:sequence>", indent)?;
            writeln!(out, "{}\t</xsd:complexType>", indent)?;
            writeln!(out, "{}</xsd:element>", indent)
        }
    }
}

fn write_messages<W: Write>(out: &mut W, operation: &Operation) -> fmt::Result {
    let name = operation.name();

    writeln!(out, "\t<message name=\"{}\">", name)?;
    for input in operation.inputs() {
        writeln!(
            out,
            "\t\t<part name=\"{}\" type=\"{}:{}\" />",
            input.name,
            input.descriptor.schema_prefix(),
            input.descriptor.schema_name()
        )?;
    }
    writeln!(out, "\t</message>")?;

    let output = operation.output();
    writeln!(out, "\t<message name=\"{}Response\">", name)?;
    writeln!(
        out,
        "\t\t<part name=\"{}Result\" type=\"{}:{}\" />",
        name,
        output.schema_prefix(),
        output.schema_name()
    )?;
    writeln!(out, "\t</message>")?;

    if !operation.faults().is_empty() {
        writeln!(out, "\t<message name=\"{}Fault\">", name)?;
        for fault in operation.faults() {
            writeln!(out, "\t\t<part name=\"{fault}\" type=\"tns:{fault}Fault\" />")?;
        }
        writeln!(out, "\t</message>")?;
    }
    Ok(())
}

fn write_port_type<W: Write>(out: &mut W, service: &Service) -> fmt::Result {
    writeln!(out, "\t<portType name=\"{}_PortType\">", service.name())?;
    for operation in service.operations() {
        let name = operation.name();
        writeln!(out, "\t\t<operation name=\"{}\">", name)?;
        writeln!(out, "\t\t\t<input message=\"tns:{}\"/>", name)?;
        writeln!(out, "\t\t\t<output message=\"tns:{}Response\"/>", name)?;
        for fault in operation.faults() {
            writeln!(
                out,
                "\t\t\t<fault name=\"{}\" message=\"tns:{}Fault\"/>",
                fault, name
            )?;
        }
        writeln!(out, "\t\t</operation>")?;
    }
    writeln!(out, "\t</portType>")
}

fn write_binding<W: Write>(out: &mut W, service: &Service, options: &WsdlOptions<'_>) -> fmt::Result {
    let service_name = service.name();
    let namespace = format!("{}{}", options.binding_namespace_prefix, service_name);

    writeln!(
        out,
        "\t<binding name=\"{service_name}_Binding\" type=\"tns:{service_name}_PortType\">"
    )?;
    writeln!(
        out,
        "\t\t<soap:binding style=\"rpc\" transport=\"{}\" />",
        SOAP_HTTP_TRANSPORT
    )?;

    for operation in service.operations() {
        let name = operation.name();
        writeln!(out, "\t\t<operation name=\"{}\">", name)?;
        writeln!(out, "\t\t\t<soap:operation soapAction=\"{}\" />", name)?;

        for direction in ["input", "output"] {
            writeln!(out, "\t\t\t<{}>", direction)?;
            write_encoded_body(out, "soap:body", None, &namespace)?;
            writeln!(out, "\t\t\t</{}>", direction)?;
        }

        if !operation.faults().is_empty() {
            writeln!(out, "\t\t\t<fault>")?;
            let fault_name = format!("{}Fault", name);
            write_encoded_body(out, "soap:fault", Some(&fault_name), &namespace)?;
            writeln!(out, "\t\t\t</fault>")?;
        }
        writeln!(out, "\t\t</operation>")?;
    }
    writeln!(out, "\t</binding>")
}

fn write_encoded_body<W: Write>(
    out: &mut W,
    element: &str,
    name: Option<&str>,
    namespace: &str,
) -> fmt::Result {
    match name {
        Some(name) => writeln!(out, "\t\t\t\t<{} name=\"{}\"", element, name)?,
        None => writeln!(out, "\t\t\t\t<{}", element)?,
    }
    writeln!(out, "\t\t\t\t\tencodingStyle=\"{}\"", SOAP_ENCODING_NS)?;
    writeln!(out, "\t\t\t\t\tnamespace=\"{}\"", namespace)?;
    writeln!(out, "\t\t\t\t\tuse=\"encoded\"/>")
}
