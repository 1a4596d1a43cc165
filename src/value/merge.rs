//! Deep merge used by the `merge` statement action (and therefore by
//! `extends`).

use super::{Object, Value};

/// Merges `incoming` under `target`: object/object pairs recurse, and for
/// any other pairing the value already in `target` stays. Keys only present
/// in `incoming` are inserted, preserving their relative order after the
/// existing keys.
pub(crate) fn merge_under(target: &mut Object, incoming: Object) {
    for (key, value) in incoming {
        match target.get_mut(&key) {
            None => {
                target.insert(key, value);
            }
            Some(Value::Object(existing)) => {
                if let Value::Object(incoming_obj) = value {
                    merge_under(existing, incoming_obj);
                }
            }
            Some(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(pairs: Vec<(&str, Value)>) -> Object {
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn existing_keys_win() {
        let mut target = obj(vec![("k", Value::Integer(5))]);
        merge_under(
            &mut target,
            obj(vec![("k", Value::Integer(1)), ("other", Value::Integer(3))]),
        );
        assert_eq!(target["k"], Value::Integer(5));
        assert_eq!(target["other"], Value::Integer(3));
    }

    #[test]
    fn object_pairs_recurse() {
        let mut target = obj(vec![(
            "server",
            Value::Object(obj(vec![("port", Value::Integer(9000))])),
        )]);
        merge_under(
            &mut target,
            obj(vec![(
                "server",
                Value::Object(obj(vec![
                    ("port", Value::Integer(80)),
                    ("host", Value::from("0.0.0.0")),
                ])),
            )]),
        );
        let server = target["server"].as_object().unwrap();
        assert_eq!(server["port"], Value::Integer(9000));
        assert_eq!(server["host"], Value::from("0.0.0.0"));
    }

    #[test]
    fn arrays_do_not_blend() {
        let mut target = obj(vec![("list", Value::Array(vec![Value::Integer(1)]))]);
        merge_under(
            &mut target,
            obj(vec![(
                "list",
                Value::Array(vec![Value::Integer(2), Value::Integer(3)]),
            )]),
        );
        assert_eq!(target["list"], Value::Array(vec![Value::Integer(1)]));
    }

    #[test]
    fn object_under_primitive_keeps_primitive() {
        let mut target = obj(vec![("x", Value::Integer(1))]);
        merge_under(&mut target, obj(vec![("x", Value::Object(Object::new()))]));
        assert_eq!(target["x"], Value::Integer(1));
    }
}
