//! Translates a dispatcher request record into the `(target, args)` shape
//! `amf_codec::encode::encode_invocation` expects (§4.6, §4.7).
//!
//! The upstream server's remoting convention addresses a method as
//! `"<dest>.<op>"` with a single positional argument list; this mirrors how
//! the dispatcher's own `dest`/`op` split (§4.2's routing table) is already
//! named after that convention.

use proxy_wire::request_record::{GenericElement, RequestPayload};
use serde_json::Value;

pub fn invocation_target(dest: &str, op: &str) -> String {
    format!("{dest}.{op}")
}

pub fn invocation_args(payload: &RequestPayload) -> Vec<Value> {
    match payload {
        RequestPayload::None => vec![],
        RequestPayload::Numeric(n) => vec![Value::from(*n)],
        RequestPayload::Str(s) => vec![Value::String(s.clone())],
        RequestPayload::List(ids) => {
            vec![Value::Array(ids.iter().map(|id| Value::from(*id)).collect())]
        }
        RequestPayload::Generic(elements) => elements
            .iter()
            .map(|element| match element {
                GenericElement::Numeric(n) => Value::from(*n),
                GenericElement::Str(s) => Value::String(s.clone()),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn target_joins_dest_and_op_with_a_dot() {
        assert_eq!(
            invocation_target("summonerService", "getSummonerByName"),
            "summonerService.getSummonerByName"
        );
    }

    #[test]
    fn numeric_payload_becomes_a_single_numeric_arg() {
        assert_eq!(invocation_args(&RequestPayload::Numeric(42)), vec![json!(42)]);
    }

    #[test]
    fn list_payload_becomes_a_single_array_arg() {
        assert_eq!(
            invocation_args(&RequestPayload::List(vec![1, 2, 3])),
            vec![json!([1, 2, 3])]
        );
    }

    #[test]
    fn generic_payload_spreads_into_positional_args() {
        let payload = RequestPayload::Generic(vec![
            GenericElement::Numeric(99),
            GenericElement::Str("CLASSIC".to_owned()),
        ]);
        assert_eq!(invocation_args(&payload), vec![json!(99), json!("CLASSIC")]);
    }
}
