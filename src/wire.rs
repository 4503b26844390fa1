//! The opcode protocol between a session and its client.
//!
//! A frame is one opcode byte followed by a UTF-8 JSON payload.
//! [`Patch`]es are encoded as JSON arrays `[code, ...operands]`, with maps in their store's insertion order.

use crate::{
	behavior::ComponentEvent,
	diff::{Patch, PatchCode},
	error::CodecError,
	node::ComponentId,
	registry::RootId,
};
use core::fmt::{self, Display, Formatter};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
	ApplyPatch = 1,
	DispatchComponentEvent = 100,
	ExecuteJs = 101,
	JsExecutionResult = 111,
	NavigateTo = 120,
	NavigationResult = 121,
	ComponentUnknown = 150,
}
impl Opcode {
	/// Whether the server sends this kind of message, as opposed to receiving it.
	#[must_use]
	pub fn is_outbound(self) -> bool {
		matches!(self, Self::ApplyPatch | Self::ExecuteJs | Self::NavigateTo | Self::ComponentUnknown)
	}
}
impl TryFrom<u8> for Opcode {
	type Error = u8;

	fn try_from(value: u8) -> Result<Self, Self::Error> {
		Ok(match value {
			1 => Self::ApplyPatch,
			100 => Self::DispatchComponentEvent,
			101 => Self::ExecuteJs,
			111 => Self::JsExecutionResult,
			120 => Self::NavigateTo,
			121 => Self::NavigationResult,
			150 => Self::ComponentUnknown,
			unknown => return Err(unknown),
		})
	}
}

/// Links an [`ExecuteJs`](`Message::ExecuteJs`) request to its [`JsExecutionResult`](`Message::JsExecutionResult`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(pub u64);
impl Display for CorrelationId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptType {
	#[default]
	Classic,
	Module,
}

/// What the client reports for one script execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionOutcome {
	Value(Value),
	/// The script threw. Carries the client's error message.
	Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
	ApplyPatch { root: RootId, patches: Vec<Patch> },
	DispatchComponentEvent { component: ComponentId, event: ComponentEvent },
	ExecuteJs { id: CorrelationId, code: String, script_type: ScriptType },
	JsExecutionResult { id: CorrelationId, outcome: ExecutionOutcome },
	NavigateTo { url: String },
	NavigationResult { success: bool, url: String },
	ComponentUnknown { component: ComponentId },
}
impl Message {
	#[must_use]
	pub fn opcode(&self) -> Opcode {
		match self {
			Message::ApplyPatch { .. } => Opcode::ApplyPatch,
			Message::DispatchComponentEvent { .. } => Opcode::DispatchComponentEvent,
			Message::ExecuteJs { .. } => Opcode::ExecuteJs,
			Message::JsExecutionResult { .. } => Opcode::JsExecutionResult,
			Message::NavigateTo { .. } => Opcode::NavigateTo,
			Message::NavigationResult { .. } => Opcode::NavigationResult,
			Message::ComponentUnknown { .. } => Opcode::ComponentUnknown,
		}
	}
}

#[derive(Serialize)]
struct ApplyPatchOut<'a> {
	root: &'a RootId,
	patches: &'a [Patch],
}

#[derive(Deserialize)]
struct ApplyPatchIn {
	root: RootId,
	patches: Vec<Value>,
}

#[derive(Serialize, Deserialize)]
struct DispatchPayload {
	component: ComponentId,
	#[serde(flatten)]
	event: ComponentEvent,
}

#[derive(Serialize, Deserialize)]
struct ExecuteJsPayload {
	id: CorrelationId,
	code: String,
	#[serde(default)]
	script_type: ScriptType,
}

#[derive(Serialize, Deserialize)]
struct ResultPayload {
	id: CorrelationId,
	#[serde(flatten)]
	outcome: ExecutionOutcome,
}

#[derive(Serialize, Deserialize)]
struct NavigateToPayload {
	url: String,
}

#[derive(Serialize, Deserialize)]
struct NavigationResultPayload {
	success: bool,
	url: String,
}

#[derive(Serialize, Deserialize)]
struct ComponentUnknownPayload {
	component: ComponentId,
}

/// Serializes `message` into one frame.
///
/// # Errors
///
/// [`CodecError::Payload`] if the payload can't be represented as JSON.
pub fn encode(message: &Message) -> Result<Vec<u8>, CodecError> {
	let mut frame = vec![message.opcode() as u8];
	match message {
		Message::ApplyPatch { root, patches } => return encode_patches(root, patches),
		Message::DispatchComponentEvent { component, event } => serde_json::to_writer(
			&mut frame,
			&DispatchPayload {
				component: component.clone(),
				event: event.clone(),
			},
		)?,
		Message::ExecuteJs { id, code, script_type } => serde_json::to_writer(
			&mut frame,
			&ExecuteJsPayload {
				id: *id,
				code: code.clone(),
				script_type: *script_type,
			},
		)?,
		Message::JsExecutionResult { id, outcome } => serde_json::to_writer(&mut frame, &ResultPayload { id: *id, outcome: outcome.clone() })?,
		Message::NavigateTo { url } => serde_json::to_writer(&mut frame, &NavigateToPayload { url: url.clone() })?,
		Message::NavigationResult { success, url } => serde_json::to_writer(&mut frame, &NavigationResultPayload { success: *success, url: url.clone() })?,
		Message::ComponentUnknown { component } => serde_json::to_writer(&mut frame, &ComponentUnknownPayload { component: component.clone() })?,
	}
	trace!(opcode = ?message.opcode(), len = frame.len(), "Encoded frame.");
	Ok(frame)
}

/// Encodes an [`ApplyPatch`](`Message::ApplyPatch`) frame without taking ownership of `patches`.
///
/// # Errors
///
/// [`CodecError::Payload`] if the payload can't be represented as JSON.
pub fn encode_patches(root: &RootId, patches: &[Patch]) -> Result<Vec<u8>, CodecError> {
	let mut frame = vec![Opcode::ApplyPatch as u8];
	serde_json::to_writer(&mut frame, &ApplyPatchOut { root, patches })?;
	trace!(count = patches.len(), len = frame.len(), "Encoded patches.");
	Ok(frame)
}

/// Parses one frame.
///
/// # Errors
///
/// - [`CodecError::Empty`] for a zero-length frame,
/// - [`CodecError::UnknownOpcode`] if the first byte isn't an [`Opcode`],
/// - [`CodecError::UnknownPatchCode`] for an `APPLY_PATCH` entry with an unknown code,
/// - [`CodecError::Payload`] if the payload doesn't match the opcode.
pub fn decode(frame: &[u8]) -> Result<Message, CodecError> {
	let (&opcode, payload) = frame.split_first().ok_or(CodecError::Empty)?;
	let opcode = Opcode::try_from(opcode).map_err(CodecError::UnknownOpcode)?;
	trace!(?opcode, len = frame.len(), "Decoding frame.");
	Ok(match opcode {
		Opcode::ApplyPatch => {
			let ApplyPatchIn { root, patches } = serde_json::from_slice(payload)?;
			Message::ApplyPatch {
				root,
				patches: patches.into_iter().map(decode_patch).collect::<Result<_, _>>()?,
			}
		}
		Opcode::DispatchComponentEvent => {
			let DispatchPayload { component, event } = serde_json::from_slice(payload)?;
			Message::DispatchComponentEvent { component, event }
		}
		Opcode::ExecuteJs => {
			let ExecuteJsPayload { id, code, script_type } = serde_json::from_slice(payload)?;
			Message::ExecuteJs { id, code, script_type }
		}
		Opcode::JsExecutionResult => {
			let ResultPayload { id, outcome } = serde_json::from_slice(payload)?;
			Message::JsExecutionResult { id, outcome }
		}
		Opcode::NavigateTo => {
			let NavigateToPayload { url } = serde_json::from_slice(payload)?;
			Message::NavigateTo { url }
		}
		Opcode::NavigationResult => {
			let NavigationResultPayload { success, url } = serde_json::from_slice(payload)?;
			Message::NavigationResult { success, url }
		}
		Opcode::ComponentUnknown => {
			let ComponentUnknownPayload { component } = serde_json::from_slice(payload)?;
			Message::ComponentUnknown { component }
		}
	})
}

fn malformed(message: impl Display) -> CodecError {
	CodecError::Payload(<serde_json::Error as serde::de::Error>::custom(message))
}

fn operand<T: DeserializeOwned>(operands: &mut impl Iterator<Item = Value>, code: PatchCode) -> Result<T, CodecError> {
	let value = operands.next().ok_or_else(|| malformed(format_args!("missing operand for {:?}", code)))?;
	Ok(serde_json::from_value(value)?)
}

/// Parses one `[code, ...operands]` patch.
///
/// # Errors
///
/// [`CodecError::UnknownPatchCode`] or [`CodecError::Payload`].
pub fn decode_patch(value: Value) -> Result<Patch, CodecError> {
	let Value::Array(items) = value else {
		return Err(malformed("patch is not an array"));
	};
	let mut items = items.into_iter();
	let code = items.next().and_then(|code| code.as_u64()).ok_or_else(|| malformed("patch code missing"))?;
	let code = u8::try_from(code).map_err(|_| malformed(format_args!("patch code {} out of range", code)))?;
	let code = PatchCode::try_from(code).map_err(CodecError::UnknownPatchCode)?;
	let operands = &mut items;
	let patch = match code {
		PatchCode::ReplaceNode => Patch::ReplaceNode {
			path: operand(operands, code)?,
			node: operand(operands, code)?,
		},
		PatchCode::RemoveNode => Patch::RemoveNode { path: operand(operands, code)? },
		PatchCode::InsertNode => Patch::InsertNode {
			parent: operand(operands, code)?,
			index: operand(operands, code)?,
			node: operand(operands, code)?,
		},
		PatchCode::AlterText => Patch::AlterText {
			path: operand(operands, code)?,
			text: operand(operands, code)?,
		},
		PatchCode::ReplaceProps => Patch::ReplaceProps {
			path: operand(operands, code)?,
			props: operand(operands, code)?,
		},
		PatchCode::ReplaceStyle => Patch::ReplaceStyle {
			path: operand(operands, code)?,
			style: operand(operands, code)?,
		},
		PatchCode::MoveNode => Patch::MoveNode {
			parent: operand(operands, code)?,
			from: operand(operands, code)?,
			to: operand(operands, code)?,
		},
	};
	if items.next().is_some() {
		return Err(malformed(format_args!("too many operands for {:?}", code)));
	}
	Ok(patch)
}

impl Serialize for Patch {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let code = self.code() as u8;
		match self {
			Patch::ReplaceNode { path, node } => (code, path, node).serialize(serializer),
			Patch::RemoveNode { path } => (code, path).serialize(serializer),
			Patch::InsertNode { parent, index, node } => (code, parent, index, node).serialize(serializer),
			Patch::AlterText { path, text } => (code, path, text).serialize(serializer),
			Patch::ReplaceProps { path, props } => (code, path, props).serialize(serializer),
			Patch::ReplaceStyle { path, style } => (code, path, style).serialize(serializer),
			Patch::MoveNode { parent, from, to } => (code, parent, from, to).serialize(serializer),
		}
	}
}

impl<'de> Deserialize<'de> for Patch {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		decode_patch(Value::deserialize(deserializer)?).map_err(serde::de::Error::custom)
	}
}
