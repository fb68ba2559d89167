//! Services and their operations.
//!
//! A [`ServiceBuilder`] collects operations during startup; [`ServiceBuilder::build`]
//! freezes them into an immutable [`Service`] that is shared read-only by every
//! request.

use crate::error::{FaultCode, SoapFault};
use crate::marshal::scalar_text;
use crate::reflect::{derive_inputs, describe_type, TypeHint};
use crate::types::{ObjectType, TypeDescriptor};
use futures::future::BoxFuture;
use futures::FutureExt;
use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Result of an operation call.
pub type OperationResult = Result<Value, SoapFault>;

type Handler = Arc<dyn Fn(Arguments) -> Invocation + Send + Sync>;

/// An operation call that has either completed or is still running.
pub enum Invocation {
    Ready(OperationResult),
    Pending(BoxFuture<'static, OperationResult>),
}

impl Invocation {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// Wait for the result.
    pub async fn resolve(self) -> OperationResult {
        match self {
            Self::Ready(result) => result,
            Self::Pending(future) => future.await,
        }
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Self::Pending(_) => f.write_str("Pending"),
        }
    }
}

/// Positional arguments handed to an operation, in declared input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(Vec<Value>);

impl Arguments {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn value(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Deserialize the argument at `index` into a domain type.
    pub fn get<T: DeserializeOwned>(&self, index: usize) -> Result<T, SoapFault> {
        let value = self.0.get(index).cloned().unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|e| {
            SoapFault::new(
                FaultCode::InvalidInputType,
                format!("Invalid input [#{}]: {}", index, e),
            )
        })
    }

    /// The argument at `index` as text. Absent and null arguments are empty.
    pub fn text(&self, index: usize) -> String {
        self.0.get(index).map(scalar_text).unwrap_or_default()
    }

    pub fn into_inner(self) -> Vec<Value> {
        self.0
    }
}

/// A declared operation input.
#[derive(Debug, Clone, PartialEq)]
pub struct Input {
    pub name: String,
    pub descriptor: TypeDescriptor,
    pub required: bool,
}

impl Input {
    pub fn new(name: impl Into<String>, descriptor: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            descriptor,
            required: true,
        }
    }
}

/// A registered operation.
#[derive(Clone)]
pub struct Operation {
    name: String,
    handler: Handler,
    inputs: Vec<Input>,
    output: TypeDescriptor,
    faults: Vec<String>,
}

impl Operation {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inputs in positional call order.
    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    pub fn input(&self, name: &str) -> Option<&Input> {
        self.inputs.iter().find(|i| i.name == name)
    }

    pub fn output(&self) -> &TypeDescriptor {
        &self.output
    }

    pub fn faults(&self) -> &[String] {
        &self.faults
    }

    /// Call the bound handler.
    pub fn invoke(&self, arguments: Arguments) -> Invocation {
        (self.handler)(arguments)
    }

    /// Object types referenced by this operation: output first, then inputs.
    pub fn collect_object_types(&self, objects: &mut IndexMap<String, Arc<ObjectType>>) {
        collect_descriptor(&self.output, objects);
        for input in &self.inputs {
            collect_descriptor(&input.descriptor, objects);
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("output", &self.output)
            .field("faults", &self.faults)
            .finish_non_exhaustive()
    }
}

fn collect_descriptor(descriptor: &TypeDescriptor, objects: &mut IndexMap<String, Arc<ObjectType>>) {
    if let TypeDescriptor::Object(object) = descriptor {
        // Last writer wins; IndexMap keeps the first position.
        objects.insert(object.type_name.clone(), Arc::clone(object));
        for member in &object.members {
            collect_descriptor(&member.descriptor, objects);
        }
    }
}

/// Mutable view of an operation while its service is being assembled.
pub struct OperationBuilder {
    name: String,
    handler: Handler,
    inputs: Vec<Input>,
    output: TypeDescriptor,
    faults: Vec<String>,
}

impl OperationBuilder {
    fn new(name: String, handler: Handler) -> Self {
        Self {
            name,
            handler,
            inputs: Vec::new(),
            output: TypeDescriptor::STRING,
            faults: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Seed string-typed inputs from a declared parameter list.
    pub fn signature(&mut self, signature: &str) -> &mut Self {
        for (name, descriptor) in derive_inputs(signature) {
            self.set_input(name, descriptor);
        }
        self
    }

    /// Declare an input or replace its descriptor.
    pub fn input(&mut self, name: impl Into<String>, hint: impl Into<TypeHint>) -> &mut Self {
        self.set_input_type(name, hint)
    }

    pub fn set_input_type(&mut self, name: impl Into<String>, hint: impl Into<TypeHint>) -> &mut Self {
        self.set_input(name.into(), describe_type(hint));
        self
    }

    pub fn set_output_type(&mut self, hint: impl Into<TypeHint>) -> &mut Self {
        self.output = describe_type(hint);
        self
    }

    /// Mark an input as required or optional. Unknown names are ignored.
    pub fn set_required(&mut self, name: &str, required: bool) -> &mut Self {
        if let Some(input) = self.inputs.iter_mut().find(|i| i.name == name) {
            input.required = required;
        }
        self
    }

    pub fn add_fault(&mut self, name: impl Into<String>) -> &mut Self {
        self.faults.push(name.into());
        self
    }

    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    fn set_input(&mut self, name: String, descriptor: TypeDescriptor) {
        match self.inputs.iter_mut().find(|i| i.name == name) {
            Some(input) => input.descriptor = descriptor,
            None => self.inputs.push(Input::new(name, descriptor)),
        }
    }

    fn build(self) -> Operation {
        Operation {
            name: self.name,
            handler: self.handler,
            inputs: self.inputs,
            output: self.output,
            faults: self.faults,
        }
    }
}

/// A native type that can register its own operations.
pub trait SoapService: Send + Sync + Sized + 'static {
    fn register(service: &mut ServiceBuilder<Self>);
}

/// Assembles the operations of a service bound to `instance`.
pub struct ServiceBuilder<S> {
    name: String,
    instance: Arc<S>,
    operations: IndexMap<String, OperationBuilder>,
}

impl<S: Send + Sync + 'static> ServiceBuilder<S> {
    pub fn new(name: impl Into<String>, instance: S) -> Self {
        Self::with_instance(name, Arc::new(instance))
    }

    pub fn with_instance(name: impl Into<String>, instance: Arc<S>) -> Self {
        Self {
            name: name.into(),
            instance,
            operations: IndexMap::new(),
        }
    }

    /// Create a builder pre-populated by the type's own registration.
    pub fn from_service(name: impl Into<String>, instance: S) -> Self
    where
        S: SoapService,
    {
        let mut builder = Self::new(name, instance);
        S::register(&mut builder);
        builder
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a synchronous operation bound to the service instance.
    pub fn operation<F, T>(&mut self, name: impl Into<String>, operation: F) -> &mut OperationBuilder
    where
        F: Fn(&S, Arguments) -> Result<T, SoapFault> + Send + Sync + 'static,
        T: Serialize,
    {
        let scope = Arc::clone(&self.instance);
        self.scoped_operation(name, scope, operation)
    }

    /// Register a synchronous operation bound to an explicit scope.
    pub fn scoped_operation<U, F, T>(
        &mut self,
        name: impl Into<String>,
        scope: Arc<U>,
        operation: F,
    ) -> &mut OperationBuilder
    where
        U: Send + Sync + 'static,
        F: Fn(&U, Arguments) -> Result<T, SoapFault> + Send + Sync + 'static,
        T: Serialize,
    {
        let handler: Handler = Arc::new(move |arguments| {
            Invocation::Ready(operation(&*scope, arguments).and_then(|value| to_value(&value)))
        });
        self.insert(name.into(), handler)
    }

    /// Register an operation whose result resolves later.
    pub fn async_operation<F, Fut, T>(&mut self, name: impl Into<String>, operation: F) -> &mut OperationBuilder
    where
        F: Fn(Arc<S>, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, SoapFault>> + Send + 'static,
        T: Serialize,
    {
        let scope = Arc::clone(&self.instance);
        let handler: Handler = Arc::new(move |arguments| {
            let future = operation(Arc::clone(&scope), arguments);
            Invocation::Pending(
                async move { future.await.and_then(|value| to_value(&value)) }.boxed(),
            )
        });
        self.insert(name.into(), handler)
    }

    /// Access a registered operation to refine its types or faults.
    pub fn get_operation(&mut self, name: &str) -> Option<&mut OperationBuilder> {
        self.operations.get_mut(name)
    }

    /// Freeze into an immutable service.
    pub fn build(self) -> Service {
        Service {
            name: self.name,
            instance: self.instance,
            operations: self
                .operations
                .into_iter()
                .map(|(name, operation)| (name, operation.build()))
                .collect(),
        }
    }

    fn insert(&mut self, name: String, handler: Handler) -> &mut OperationBuilder {
        let operation = OperationBuilder::new(name.clone(), handler);
        match self.operations.entry(name) {
            Entry::Occupied(mut entry) => {
                entry.insert(operation);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(operation),
        }
    }
}

fn to_value<T: Serialize>(value: &T) -> OperationResult {
    serde_json::to_value(value).map_err(|e| {
        SoapFault::new(
            FaultCode::OperationFault,
            format!("Could not serialize operation result: {}", e),
        )
    })
}

/// An immutable service: a name, its bound instance and its operations.
pub struct Service {
    name: String,
    instance: Arc<dyn Any + Send + Sync>,
    operations: IndexMap<String, Operation>,
}

impl Service {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get_operation(&self, name: &str) -> Option<&Operation> {
        self.operations.get(name)
    }

    /// Operations in registration order.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.values()
    }

    /// The bound instance, if it is of type `S`.
    pub fn instance<S: Send + Sync + 'static>(&self) -> Option<Arc<S>> {
        Arc::clone(&self.instance).downcast::<S>().ok()
    }

    /// Every object type reachable from the operations, once per type name.
    pub fn collect_object_types(&self) -> IndexMap<String, Arc<ObjectType>> {
        let mut objects = IndexMap::new();
        for operation in self.operations.values() {
            operation.collect_object_types(&mut objects);
        }
        objects
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("name", &self.name)
            .field("operations", &self.operations)
            .finish_non_exhaustive()
    }
}
