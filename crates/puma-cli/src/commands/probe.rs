//! Direct probes of the central decision point.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use puma::CentralModules;
use puma_config::{PumaConfig, TransportKind};
use puma_types::{
    Action, AttributeValue, DataType, Environment, EventSink, Multiplicity, Object, OwnerKind,
    PolicyReference, Subject, TracingSink, Value, as_cached_attributes,
};
use tracing::info;

/// Sends the given attributes to the central decision point and prints the
/// decision.
pub fn run(
    project: &str,
    transport: TransportKind,
    reference: Option<&str>,
    attrs: &[String],
) -> Result<()> {
    let config = PumaConfig::load_from_dir(project).context("Failed to load configuration")?;
    let reference = match reference {
        Some(reference) => PolicyReference::new(reference),
        None => config
            .central
            .supported_policy_ids
            .first()
            .map(PolicyReference::new)
            .context("No supported policy ids configured")?,
    };

    let attributes = parse_attributes(attrs)?;
    let (subject, object, action, environment) = into_parties(attributes)?;
    let cache = as_cached_attributes(&subject, &object, &action, &environment);

    let events: Arc<dyn EventSink> = Arc::new(TracingSink);
    let modules = CentralModules::new(config.central.clone(), None)?;
    let Some(module) = modules.module(transport, &events) else {
        bail!("transport {transport} cannot be probed from the command line");
    };
    if !module.supports_id(&reference) {
        bail!("reference {reference} is not one of the configured supported policy ids");
    }

    info!(
        module = module.label(),
        %reference,
        attributes = cache.len(),
        "probing central decision point"
    );
    let decision = module.find_and_evaluate(&reference, &cache);
    println!("{decision}");
    Ok(())
}

/// Groups `id=value` pairs by id, keeping first-seen order. One value makes
/// an ATOMIC attribute, several a GROUPED one.
fn parse_attributes(attrs: &[String]) -> Result<Vec<AttributeValue>> {
    let mut grouped: Vec<(String, Vec<Value>)> = Vec::new();
    for attr in attrs {
        let Some((id, value)) = attr.split_once('=') else {
            bail!("attribute \"{attr}\" is not of the form id=value");
        };
        let value = Value::from(value);
        match grouped.iter_mut().find(|(existing, _)| existing == id) {
            Some((_, values)) => values.push(value),
            None => grouped.push((id.to_string(), vec![value])),
        }
    }

    grouped
        .into_iter()
        .map(|(id, values)| {
            let multiplicity = if values.len() == 1 {
                Multiplicity::Atomic
            } else {
                Multiplicity::Grouped
            };
            AttributeValue::inferred(&id, DataType::String, multiplicity, values)
                .with_context(|| format!("Invalid attribute {id}"))
        })
        .collect()
}

fn into_parties(
    attributes: Vec<AttributeValue>,
) -> Result<(Subject, Object, Action, Environment)> {
    let action_id = attributes
        .iter()
        .find(|a| a.id() == "action:id" && a.multiplicity() == Multiplicity::Atomic)
        .and_then(|a| a.values().first())
        .map_or_else(|| "probe".to_string(), ToString::to_string);

    let mut subject = Subject::new("probe");
    let mut object = Object::new("probe");
    let mut action = Action::new(action_id);
    let mut environment = Environment::new();
    for attribute in attributes {
        match attribute.owner_kind() {
            OwnerKind::Subject => subject.add_attribute(attribute)?,
            OwnerKind::Resource => object.add_attribute(attribute)?,
            OwnerKind::Action if attribute.id() == "action:id" => {}
            OwnerKind::Action => action.add_attribute(attribute)?,
            OwnerKind::Environment => environment.add_attribute(attribute)?,
        }
    }
    Ok((subject, object, action, environment))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[&str]) -> Vec<String> {
        pairs.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_repeated_ids_are_grouped() {
        let parsed = parse_attributes(&attrs(&[
            "subject:roles=helpdesk",
            "action:id=read",
            "subject:roles=auditor",
        ]))
        .unwrap();

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].id(), "subject:roles");
        assert_eq!(parsed[0].multiplicity(), Multiplicity::Grouped);
        assert_eq!(parsed[0].values().len(), 2);
        assert_eq!(parsed[1].multiplicity(), Multiplicity::Atomic);
    }

    #[test]
    fn test_bad_attributes_are_rejected() {
        assert!(parse_attributes(&attrs(&["subject:roles"])).is_err());
        assert!(parse_attributes(&attrs(&["clearance=3"])).is_err());
    }

    #[test]
    fn test_action_id_names_the_action() {
        let parsed = parse_attributes(&attrs(&["action:id=read", "object:kind=ticket"])).unwrap();
        let (_, object, action, _) = into_parties(parsed).unwrap();

        assert_eq!(action.id(), "read");
        assert_eq!(action.attributes().len(), 1);
        assert_eq!(object.attributes()[0].id(), "object:kind");
    }
}
