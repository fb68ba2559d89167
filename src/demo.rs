//! Demonstration service exposed by the binary as `testService`.

use crate::error::SoapFault;
use crate::marshal::format_number;
use crate::reflect::TypeHint;
use crate::service::{Arguments, ServiceBuilder, SoapService};
use crate::types::{Describe, Slot};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Name the demo service is registered under.
pub const SERVICE_NAME: &str = "testService";

/// Structured result of `test3`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MyObject {
    pub concated: String,
    pub incremented: f64,
}

impl Describe for MyObject {
    fn type_name() -> &'static str {
        "MyObject"
    }

    fn slots() -> Vec<Slot> {
        vec![Slot::new("concated", ""), Slot::new("incremented", 0)]
    }
}

/// Structured input of `test4`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyTestObject {
    pub str_arg: String,
    pub int_arg: f64,
}

impl Describe for MyTestObject {
    fn type_name() -> &'static str {
        "MyTestObject"
    }

    fn slots() -> Vec<Slot> {
        vec![Slot::new("strArg", ""), Slot::new("intArg", 0)]
    }
}

#[derive(Debug, Default)]
pub struct TestService;

impl TestService {
    async fn test1(self: Arc<Self>, args: Arguments) -> Result<String, SoapFault> {
        Ok(args.text(0) + &args.text(1))
    }

    async fn test2(self: Arc<Self>, args: Arguments) -> Result<f64, SoapFault> {
        let sum = args.get::<f64>(0)? + args.get::<f64>(1)?;
        if !sum.is_finite() {
            return Err(SoapFault::declared(
                "ArgumentOutOfRangeException",
                "Sum is out of range",
            ));
        }
        Ok(sum)
    }

    async fn test3(self: Arc<Self>, args: Arguments) -> Result<MyObject, SoapFault> {
        let int_arg = args.get::<f64>(1)?;
        Ok(MyObject {
            concated: format!("{}[{}]", args.text(0), format_number(int_arg)),
            incremented: int_arg + 1.0,
        })
    }

    async fn test4(self: Arc<Self>, args: Arguments) -> Result<String, SoapFault> {
        let input = args.get::<MyTestObject>(0)?;
        Ok(format!("{}[{}]", input.str_arg, format_number(input.int_arg)))
    }

    fn test5(&self, _args: Arguments) -> Result<&'static str, SoapFault> {
        Ok("000-000-000")
    }
}

impl SoapService for TestService {
    fn register(service: &mut ServiceBuilder<Self>) {
        service
            .async_operation("test1", TestService::test1)
            .signature("(myArg1, myArg2)");

        service
            .async_operation("test2", TestService::test2)
            .signature("(myArg1, myArg2)")
            .set_output_type("number")
            .set_input_type("myArg1", "number")
            .set_input_type("myArg2", "number")
            .add_fault("ArgumentOutOfRangeException");

        service
            .async_operation("test3", TestService::test3)
            .signature("(strArg, intArg)")
            .set_output_type(TypeHint::of::<MyObject>())
            .set_input_type("intArg", "number");

        service
            .async_operation("test4", TestService::test4)
            .signature("(myTestObjectInstance)")
            .set_input_type("myTestObjectInstance", TypeHint::of::<MyTestObject>());

        service.operation("test5", TestService::test5).signature("()");
    }
}

/// Build the demo service.
pub fn test_service() -> ServiceBuilder<TestService> {
    ServiceBuilder::from_service(SERVICE_NAME, TestService)
}
