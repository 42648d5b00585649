//! Provider request bodies for template messages.

use serde::Serialize;

use wabulk_core::{ComponentSpec, Contact, ParameterSpec, Placeholder, TemplateRequest};

pub const DEFAULT_COUNTRY_CODE: &str = "91";

/// Body of `POST /{phone-number-id}/messages` for a template message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderPayload {
    pub messaging_product: &'static str,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub template: TemplatePayload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplatePayload {
    pub name: String,
    pub language: LanguagePayload,
    pub components: Vec<ComponentSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguagePayload {
    pub policy: &'static str,
    pub code: String,
}

/// Builds per-contact payloads.
///
/// Destinations are the normalized phone prefixed with a single, fixed
/// country calling code; numbers from other countries are not supported.
#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    country_code: String,
}

impl Default for PayloadBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_COUNTRY_CODE)
    }
}

impl PayloadBuilder {
    pub fn new(country_code: impl Into<String>) -> Self {
        Self {
            country_code: country_code.into(),
        }
    }

    pub fn build(
        &self,
        template: &TemplateRequest,
        contact: &Contact,
        resolved_phone: &str,
    ) -> ProviderPayload {
        let components = template
            .components
            .iter()
            .map(|component| ComponentSpec {
                kind: component.kind,
                parameters: component
                    .parameters
                    .iter()
                    .map(|p| resolve_parameter(p, contact, resolved_phone))
                    .collect(),
            })
            .collect();

        ProviderPayload {
            messaging_product: "whatsapp",
            to: format!("{}{}", self.country_code, resolved_phone),
            kind: "template",
            template: TemplatePayload {
                name: template.template_name.clone(),
                language: LanguagePayload {
                    policy: "deterministic",
                    code: template.language().to_string(),
                },
                components,
            },
        }
    }
}

fn resolve_parameter(param: &ParameterSpec, contact: &Contact, phone: &str) -> ParameterSpec {
    match param {
        ParameterSpec::Text(text) => match text.placeholder() {
            Some(Placeholder::Name) => ParameterSpec::Text(text.with_text(contact.display_name())),
            Some(Placeholder::Phone) => ParameterSpec::Text(text.with_text(phone)),
            None => param.clone(),
        },
        ParameterSpec::Media(_) => param.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wabulk_core::{ComponentKind, Placeholder};

    fn template() -> TemplateRequest {
        TemplateRequest::new("order_update")
            .with_language("en")
            .with_component(ComponentSpec::header(vec![ParameterSpec::Media(json!({
                "type": "image",
                "image": {"link": "{{name}}"}
            }))]))
            .with_component(ComponentSpec::body(vec![
                ParameterSpec::placeholder(Placeholder::Name),
                ParameterSpec::placeholder(Placeholder::Phone),
                ParameterSpec::text("Diwali sale"),
            ]))
    }

    #[test]
    fn resolves_placeholders_per_contact() {
        let contact = Contact::new("+91 98765 43210").with_name("Asha");
        let payload = PayloadBuilder::default().build(&template(), &contact, "9876543210");

        let body = &payload.template.components[1];
        assert_eq!(body.kind, ComponentKind::Body);
        assert_eq!(
            body.parameters,
            vec![
                ParameterSpec::text("Asha"),
                ParameterSpec::text("9876543210"),
                ParameterSpec::text("Diwali sale"),
            ]
        );
    }

    #[test]
    fn media_parameters_pass_through_untouched() {
        let contact = Contact::new("1").with_name("Asha");
        let payload = PayloadBuilder::default().build(&template(), &contact, "1");
        assert_eq!(
            payload.template.components[0].parameters,
            template().components[0].parameters
        );
    }

    #[test]
    fn missing_name_resolves_to_empty_text() {
        let t = TemplateRequest::new("hello").with_component(ComponentSpec::body(vec![
            ParameterSpec::placeholder(Placeholder::Name),
        ]));
        let payload = PayloadBuilder::default().build(&t, &Contact::new("1"), "1");
        assert_eq!(
            payload.template.components[0].parameters,
            vec![ParameterSpec::text("")]
        );
    }

    #[test]
    fn named_parameters_keep_their_names() {
        let body: ComponentSpec = serde_json::from_value(json!({
            "type": "body",
            "parameters": [
                {"type": "text", "text": "Hi", "parameter_name": "greeting"},
                {"type": "text", "text": "{{name}}", "parameter_name": "first_name"}
            ]
        }))
        .unwrap();
        let t = TemplateRequest::new("named").with_component(body);

        let contact = Contact::new("9876500001").with_name("Asha");
        let payload = PayloadBuilder::default().build(&t, &contact, "9876500001");

        assert_eq!(
            serde_json::to_value(&payload.template.components[0].parameters).unwrap(),
            json!([
                {"type": "text", "text": "Hi", "parameter_name": "greeting"},
                {"type": "text", "text": "Asha", "parameter_name": "first_name"}
            ])
        );
    }

    #[test]
    fn wire_shape_matches_provider_contract() {
        let payload = PayloadBuilder::new("1").build(
            &TemplateRequest::new("hello_world"),
            &Contact::new("5"),
            "5550100",
        );

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "messaging_product": "whatsapp",
                "to": "15550100",
                "type": "template",
                "template": {
                    "name": "hello_world",
                    "language": {"policy": "deterministic", "code": "en_US"},
                    "components": []
                }
            })
        );
    }
}
