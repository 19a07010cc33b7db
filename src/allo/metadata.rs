//! Typed inputs for the domain actions and the metadata documents uploaded for them.
//!
//! Every action validates its input before the metadata stage uploads anything, so malformed
//! input is rejected with a `Validation` error instead of failing later during encoding.

use crate::allo::error::{AlloError, AlloResult};

use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeSet;

/// Descriptive project fields stored off-chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetadata {
	pub description: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub website: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub logo_img: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub banner_img: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub project_twitter: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub project_github: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub user_github: Option<String>,
	/// Verifiable credentials attached by the project owner, kept opaque.
	#[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
	pub credentials: serde_json::Map<String, Value>,
}

impl ProjectMetadata {
	pub fn validate(&self) -> AlloResult<()> {
		if let Some(website) = &self.website {
			reqwest::Url::parse(website).map_err(|e| {
				AlloError::validation(format!("Invalid project website {}: {}", website, e))
			})?;
		}
		Ok(())
	}

	/// The document pinned for a project: its title plus the descriptive fields.
	pub fn to_document(&self, title: &str, created_at: i64) -> AlloResult<Value> {
		let mut document = serde_json::to_value(self).map_err(|e| {
			AlloError::encoding("Failed to serialize project metadata").with_inner(e)
		})?;
		document["title"] = json!(title);
		document["createdAt"] = json!(created_at);
		Ok(document)
	}
}

/// Arguments of `create_project`.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateProjectArgs {
	pub name: String,
	pub metadata: ProjectMetadata,
}

impl CreateProjectArgs {
	pub fn validate(&self) -> AlloResult<()> {
		validate_name(&self.name)?;
		self.metadata.validate()
	}
}

/// Arguments of `update_project_metadata`.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateProjectMetadataArgs {
	pub project_id: B256,
	/// Title carried into the new metadata document.
	pub name: String,
	pub metadata: ProjectMetadata,
}

impl UpdateProjectMetadataArgs {
	pub fn validate(&self) -> AlloResult<()> {
		validate_name(&self.name)?;
		self.metadata.validate()
	}
}

fn validate_name(name: &str) -> AlloResult<()> {
	if name.trim().is_empty() {
		return Err(AlloError::validation("Project name must not be empty"));
	}
	Ok(())
}

/// Kind of input a round asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
	Text,
	Paragraph,
	Email,
	Address,
	Number,
	Checkbox,
	Multiple,
	Dropdown,
	Link,
}

/// One question of a round's application form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationQuestion {
	pub id: u32,
	pub title: String,
	#[serde(rename = "type")]
	pub kind: QuestionKind,
	pub required: bool,
	/// Hidden answers are only shown to round operators.
	#[serde(default)]
	pub hidden: bool,
}

/// Application form published by a round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundApplicationMetadata {
	pub version: String,
	pub last_updated_on: u64,
	pub questions: Vec<ApplicationQuestion>,
}

/// Value given for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
	Text(String),
	List(Vec<String>),
	Number(i64),
}

impl AnswerValue {
	fn is_blank(&self) -> bool {
		match self {
			AnswerValue::Text(text) => text.trim().is_empty(),
			AnswerValue::List(items) => items.iter().all(|item| item.trim().is_empty()),
			AnswerValue::Number(_) => false,
		}
	}
}

/// An applicant's answer to one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationAnswer {
	pub question_id: u32,
	pub answer: AnswerValue,
}

/// Arguments of `apply_to_round`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyToRoundArgs {
	pub project_id: B256,
	/// Round contract address on v1, decimal pool id on v2.
	pub round_id: String,
	pub form_inputs: Vec<ApplicationAnswer>,
	pub project_metadata: ProjectMetadata,
	pub project_name: String,
	pub application_metadata: RoundApplicationMetadata,
	pub chain_name: String,
	/// Payout address for the project in this round.
	pub recipient: Address,
	/// Profile anchor of the project; required by v2.
	pub anchor_address: Option<Address>,
}

impl ApplyToRoundArgs {
	/// Checks the parts of the application every protocol version needs.
	pub fn validate(&self) -> AlloResult<()> {
		validate_name(&self.project_name)?;
		self.project_metadata.validate()?;

		if self.round_id.trim().is_empty() {
			return Err(AlloError::validation("Round id must not be empty"));
		}
		if self.chain_name.trim().is_empty() {
			return Err(AlloError::validation("Chain name must not be empty"));
		}
		if self.recipient.is_zero() {
			return Err(AlloError::validation("Recipient must not be the zero address"));
		}

		let known: BTreeSet<u32> = self
			.application_metadata
			.questions
			.iter()
			.map(|question| question.id)
			.collect();

		let mut answered = BTreeSet::new();
		for input in &self.form_inputs {
			if !known.contains(&input.question_id) {
				return Err(AlloError::validation(format!(
					"Answer refers to unknown question {}",
					input.question_id
				)));
			}
			if !answered.insert(input.question_id) {
				return Err(AlloError::validation(format!(
					"Question {} answered more than once",
					input.question_id
				)));
			}
		}

		for question in &self.application_metadata.questions {
			if !question.required {
				continue;
			}
			let answer = self
				.form_inputs
				.iter()
				.find(|input| input.question_id == question.id);
			if answer.is_none_or(|input| input.answer.is_blank()) {
				return Err(AlloError::validation(format!(
					"Required question {} ({}) is unanswered",
					question.id, question.title
				)));
			}
		}

		Ok(())
	}

	/// The application document pinned for a round application.
	///
	/// `round` is the version-specific round reference and `project` the id the round knows the
	/// project by.
	pub fn to_document(&self, round: &str, project: B256, created_at: i64) -> AlloResult<Value> {
		let answers: Vec<Value> = self
			.form_inputs
			.iter()
			.map(|input| {
				let question = self
					.application_metadata
					.questions
					.iter()
					.find(|question| question.id == input.question_id);
				json!({
					"questionId": input.question_id,
					"question": question.map(|q| q.title.as_str()).unwrap_or_default(),
					"type": question.map(|q| q.kind),
					"hidden": question.is_some_and(|q| q.hidden),
					"answer": input.answer,
				})
			})
			.collect();

		let project_document = self
			.project_metadata
			.to_document(&self.project_name, created_at)?;

		Ok(json!({
			"application": {
				"round": round,
				"recipient": self.recipient,
				"project": project_document,
				"projectId": project,
				"answers": answers,
			},
		}))
	}
}
