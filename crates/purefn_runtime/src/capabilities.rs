//! The capability binding map.
//!
//! The fixed set of host-provided bindings a compiled subject can reach:
//! a clock source, a JSON codec, a regex constructor, map/set collections,
//! and the four property accessors. The accessors re-validate every key
//! against the capability policy at call time, because keys flowing through
//! them exist only at run time and the static walk never saw them.

use crate::error::RuntimeError;
use crate::value::{NativeArity, NativeFunction, Value};
use indexmap::IndexMap;
use purefn_policy::{check_name, Decision};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// The binding map handed to the evaluator. A callable's free variables
/// resolve against exactly this map.
pub type Bindings = FxHashMap<String, Value>;

/// The binding name the injected guard escalates through. Raises the fatal
/// iteration-limit error.
pub const LIMIT_BINDING_NAME: &str = "__limit";

/// Build the full capability binding map for one compiled function.
pub fn capability_bindings() -> Bindings {
    let mut bindings = Bindings::default();
    bindings.insert("now".to_string(), now_binding());
    bindings.insert("JSON".to_string(), json_binding());
    bindings.insert("RegExp".to_string(), regexp_binding());
    bindings.insert("Map".to_string(), map_binding());
    bindings.insert("Set".to_string(), set_binding());
    bindings.insert("getProp".to_string(), get_prop_binding());
    bindings.insert("setProp".to_string(), set_prop_binding());
    bindings.insert("keysOf".to_string(), keys_of_binding());
    bindings.insert("deleteProp".to_string(), delete_prop_binding());
    bindings.insert(
        LIMIT_BINDING_NAME.to_string(),
        Value::Native(NativeFunction::new(
            LIMIT_BINDING_NAME,
            NativeArity::Exact(0),
            |_| Err(RuntimeError::IterationLimit),
        )),
    );
    bindings
}

// ============================================================================
// Clock
// ============================================================================

fn now_binding() -> Value {
    Value::Native(NativeFunction::new("now", NativeArity::Exact(0), |_| {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as f64)
            .unwrap_or(0.0);
        Ok(Value::Number(millis))
    }))
}

// ============================================================================
// JSON codec
// ============================================================================

fn json_binding() -> Value {
    let object = Value::new_object();
    if let Value::Object(ref map) = object {
        map.borrow_mut().insert(
            "stringify".to_string(),
            Value::Native(NativeFunction::new(
                "stringify",
                NativeArity::Exact(1),
                |args| {
                    let json = value_to_json(&args[0]);
                    serde_json::to_string(&json)
                        .map(Value::string)
                        .map_err(|e| RuntimeError::Type(format!("stringify failed: {}", e)))
                },
            )),
        );
        map.borrow_mut().insert(
            "parse".to_string(),
            Value::Native(NativeFunction::new("parse", NativeArity::Exact(1), |args| {
                let text = match &args[0] {
                    Value::Str(s) => s.to_string(),
                    other => other.display_string(),
                };
                serde_json::from_str::<serde_json::Value>(&text)
                    .map(|json| json_to_value(&json))
                    .map_err(|e| RuntimeError::Type(format!("parse failed: {}", e)))
            })),
        );
    }
    object
}

/// Convert a runtime value to JSON. Functions and `undefined` serialize as
/// null, matching the closest behavior the host can offer.
fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Undefined | Value::Null | Value::Function(_) | Value::Native(_) => {
            serde_json::Value::Null
        }
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Str(s) => serde_json::Value::String(s.to_string()),
        Value::Array(items) => {
            serde_json::Value::Array(items.borrow().iter().map(value_to_json).collect())
        }
        Value::Object(map) => serde_json::Value::Object(
            map.borrow()
                .iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        ),
    }
}

fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::string(s.clone()),
        serde_json::Value::Array(items) => {
            Value::new_array(items.iter().map(json_to_value).collect())
        }
        serde_json::Value::Object(map) => {
            let object = Value::new_object();
            if let Value::Object(ref store) = object {
                for (k, v) in map {
                    store.borrow_mut().insert(k.clone(), json_to_value(v));
                }
            }
            object
        }
    }
}

// ============================================================================
// Regex constructor
// ============================================================================

fn regexp_binding() -> Value {
    Value::Native(NativeFunction::new(
        "RegExp",
        NativeArity::Range { min: 1, max: Some(2) },
        |args| {
            let pattern = match &args[0] {
                Value::Str(s) => s.to_string(),
                other => other.display_string(),
            };
            let flags = match args.get(1) {
                Some(Value::Str(s)) => s.to_string(),
                _ => String::new(),
            };
            let mut translated = String::new();
            for flag in flags.chars() {
                match flag {
                    'i' => translated.push_str("(?i)"),
                    'm' => translated.push_str("(?m)"),
                    's' => translated.push_str("(?s)"),
                    'g' => {} // matching is not stateful here
                    other => {
                        return Err(RuntimeError::Type(format!(
                            "unsupported regex flag '{}'",
                            other
                        )))
                    }
                }
            }
            let full = format!("{}{}", translated, pattern);
            let regex = regex::Regex::new(&full)
                .map_err(|e| RuntimeError::Type(format!("invalid regex: {}", e)))?;
            Ok(regex_object(pattern, regex))
        },
    ))
}

fn regex_object(source: String, regex: regex::Regex) -> Value {
    let regex = Rc::new(regex);
    let object = Value::new_object();
    if let Value::Object(ref map) = object {
        map.borrow_mut()
            .insert("source".to_string(), Value::string(source));
        let test_regex = Rc::clone(&regex);
        map.borrow_mut().insert(
            "test".to_string(),
            Value::Native(NativeFunction::new("test", NativeArity::Exact(1), move |args| {
                let text = args[0].display_string();
                Ok(Value::Bool(test_regex.is_match(&text)))
            })),
        );
    }
    object
}

// ============================================================================
// Collections
// ============================================================================

type Store = Rc<RefCell<IndexMap<String, Value>>>;

fn key_string(value: &Value) -> String {
    value.display_string()
}

fn map_binding() -> Value {
    Value::Native(NativeFunction::new("Map", NativeArity::Exact(0), |_| {
        let store: Store = Rc::new(RefCell::new(IndexMap::new()));
        let object = Value::new_object();
        if let Value::Object(ref map) = object {
            let get_store = Rc::clone(&store);
            map.borrow_mut().insert(
                "get".to_string(),
                Value::Native(NativeFunction::new("get", NativeArity::Exact(1), move |args| {
                    let key = key_string(&args[0]);
                    Ok(get_store
                        .borrow()
                        .get(&key)
                        .cloned()
                        .unwrap_or(Value::Undefined))
                })),
            );
            let set_store = Rc::clone(&store);
            map.borrow_mut().insert(
                "set".to_string(),
                Value::Native(NativeFunction::new("set", NativeArity::Exact(2), move |args| {
                    set_store
                        .borrow_mut()
                        .insert(key_string(&args[0]), args[1].clone());
                    Ok(Value::Undefined)
                })),
            );
            let has_store = Rc::clone(&store);
            map.borrow_mut().insert(
                "has".to_string(),
                Value::Native(NativeFunction::new("has", NativeArity::Exact(1), move |args| {
                    Ok(Value::Bool(has_store.borrow().contains_key(&key_string(&args[0]))))
                })),
            );
            let delete_store = Rc::clone(&store);
            map.borrow_mut().insert(
                "delete".to_string(),
                Value::Native(NativeFunction::new(
                    "delete",
                    NativeArity::Exact(1),
                    move |args| {
                        Ok(Value::Bool(
                            delete_store
                                .borrow_mut()
                                .shift_remove(&key_string(&args[0]))
                                .is_some(),
                        ))
                    },
                )),
            );
            let size_store = Rc::clone(&store);
            map.borrow_mut().insert(
                "size".to_string(),
                Value::Native(NativeFunction::new("size", NativeArity::Exact(0), move |_| {
                    Ok(Value::Number(size_store.borrow().len() as f64))
                })),
            );
        }
        Ok(object)
    }))
}

fn set_binding() -> Value {
    Value::Native(NativeFunction::new("Set", NativeArity::Exact(0), |_| {
        let store: Store = Rc::new(RefCell::new(IndexMap::new()));
        let object = Value::new_object();
        if let Value::Object(ref map) = object {
            let add_store = Rc::clone(&store);
            map.borrow_mut().insert(
                "add".to_string(),
                Value::Native(NativeFunction::new("add", NativeArity::Exact(1), move |args| {
                    add_store
                        .borrow_mut()
                        .insert(key_string(&args[0]), args[0].clone());
                    Ok(Value::Undefined)
                })),
            );
            let has_store = Rc::clone(&store);
            map.borrow_mut().insert(
                "has".to_string(),
                Value::Native(NativeFunction::new("has", NativeArity::Exact(1), move |args| {
                    Ok(Value::Bool(has_store.borrow().contains_key(&key_string(&args[0]))))
                })),
            );
            let delete_store = Rc::clone(&store);
            map.borrow_mut().insert(
                "delete".to_string(),
                Value::Native(NativeFunction::new(
                    "delete",
                    NativeArity::Exact(1),
                    move |args| {
                        Ok(Value::Bool(
                            delete_store
                                .borrow_mut()
                                .shift_remove(&key_string(&args[0]))
                                .is_some(),
                        ))
                    },
                )),
            );
            let size_store = Rc::clone(&store);
            map.borrow_mut().insert(
                "size".to_string(),
                Value::Native(NativeFunction::new("size", NativeArity::Exact(0), move |_| {
                    Ok(Value::Number(size_store.borrow().len() as f64))
                })),
            );
        }
        Ok(object)
    }))
}

// ============================================================================
// Property accessors
// ============================================================================

fn checked_key(value: &Value) -> Result<String, RuntimeError> {
    let key = key_string(value);
    match check_name(&key) {
        Decision::Allowed => Ok(key),
        Decision::Denied(reason) => Err(RuntimeError::ForbiddenKey {
            key,
            reason: reason.describe(),
        }),
    }
}

fn get_prop_binding() -> Value {
    Value::Native(NativeFunction::new(
        "getProp",
        NativeArity::Exact(2),
        |args| {
            let key = checked_key(&args[1])?;
            match &args[0] {
                Value::Object(map) => {
                    Ok(map.borrow().get(&key).cloned().unwrap_or(Value::Undefined))
                }
                Value::Array(items) => {
                    if key == "length" {
                        return Ok(Value::Number(items.borrow().len() as f64));
                    }
                    match key.parse::<usize>() {
                        Ok(index) => Ok(items
                            .borrow()
                            .get(index)
                            .cloned()
                            .unwrap_or(Value::Undefined)),
                        Err(_) => Ok(Value::Undefined),
                    }
                }
                other => Err(RuntimeError::Type(format!(
                    "cannot read properties of {}",
                    other.type_name()
                ))),
            }
        },
    ))
}

fn set_prop_binding() -> Value {
    Value::Native(NativeFunction::new(
        "setProp",
        NativeArity::Exact(3),
        |args| {
            let key = checked_key(&args[1])?;
            match &args[0] {
                Value::Object(map) => {
                    map.borrow_mut().insert(key, args[2].clone());
                    Ok(Value::Undefined)
                }
                Value::Array(items) => match key.parse::<usize>() {
                    Ok(index) => {
                        let mut items = items.borrow_mut();
                        if index >= items.len() {
                            items.resize(index + 1, Value::Undefined);
                        }
                        items[index] = args[2].clone();
                        Ok(Value::Undefined)
                    }
                    Err(_) => Err(RuntimeError::Type(format!(
                        "invalid array index '{}'",
                        key
                    ))),
                },
                other => Err(RuntimeError::Type(format!(
                    "cannot set properties of {}",
                    other.type_name()
                ))),
            }
        },
    ))
}

fn keys_of_binding() -> Value {
    Value::Native(NativeFunction::new(
        "keysOf",
        NativeArity::Exact(1),
        |args| match &args[0] {
            // Only the own keys that pass the policy are enumerated.
            Value::Object(map) => Ok(Value::new_array(
                map.borrow()
                    .keys()
                    .filter(|key| check_name(key).is_allowed())
                    .map(|key| Value::string(key.clone()))
                    .collect(),
            )),
            Value::Array(items) => Ok(Value::new_array(
                (0..items.borrow().len())
                    .map(|i| Value::string(i.to_string()))
                    .collect(),
            )),
            other => Err(RuntimeError::Type(format!(
                "cannot enumerate {}",
                other.type_name()
            ))),
        },
    ))
}

fn delete_prop_binding() -> Value {
    Value::Native(NativeFunction::new(
        "deleteProp",
        NativeArity::Exact(2),
        |args| {
            let key = checked_key(&args[1])?;
            match &args[0] {
                Value::Object(map) => Ok(Value::Bool(
                    map.borrow_mut().shift_remove(&key).is_some(),
                )),
                other => Err(RuntimeError::Type(format!(
                    "cannot delete properties of {}",
                    other.type_name()
                ))),
            }
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn native(value: &Value) -> &Rc<NativeFunction> {
        match value {
            Value::Native(n) => n,
            other => panic!("expected native, got {}", other.type_name()),
        }
    }

    #[test]
    fn test_bindings_are_the_closed_set() {
        let bindings = capability_bindings();
        for name in purefn_policy::GLOBAL_BINDINGS {
            assert!(bindings.contains_key(*name), "missing binding {}", name);
        }
        assert!(bindings.contains_key(LIMIT_BINDING_NAME));
        assert_eq!(bindings.len(), purefn_policy::GLOBAL_BINDINGS.len() + 1);
    }

    #[test]
    fn test_get_prop_rejects_forbidden_key() {
        let bindings = capability_bindings();
        let get_prop = native(&bindings["getProp"]);
        let target = Value::new_object();
        let err = get_prop
            .call(&[target, Value::string("constructor")])
            .unwrap_err();
        assert!(matches!(err, RuntimeError::ForbiddenKey { .. }));
    }

    #[test]
    fn test_get_and_set_prop_round_trip() {
        let bindings = capability_bindings();
        let get_prop = native(&bindings["getProp"]);
        let set_prop = native(&bindings["setProp"]);
        let target = Value::new_object();

        set_prop
            .call(&[target.clone(), Value::string("price"), Value::Number(9.5)])
            .unwrap();
        let got = get_prop
            .call(&[target, Value::string("price")])
            .unwrap();
        assert!(matches!(got, Value::Number(n) if n == 9.5));
    }

    #[test]
    fn test_keys_of_filters_by_policy() {
        let bindings = capability_bindings();
        let keys_of = native(&bindings["keysOf"]);
        let target = Value::new_object();
        if let Value::Object(ref map) = target {
            map.borrow_mut().insert("price".to_string(), Value::Number(1.0));
            map.borrow_mut().insert("toString".to_string(), Value::Null);
            map.borrow_mut().insert("label".to_string(), Value::Null);
        }
        let keys = keys_of.call(&[target]).unwrap();
        match keys {
            Value::Array(items) => {
                let names: Vec<String> =
                    items.borrow().iter().map(|v| v.display_string()).collect();
                assert_eq!(names, vec!["price", "label"]);
            }
            other => panic!("expected array, got {}", other.type_name()),
        }
    }

    #[test]
    fn test_delete_prop() {
        let bindings = capability_bindings();
        let delete_prop = native(&bindings["deleteProp"]);
        let target = Value::new_object();
        if let Value::Object(ref map) = target {
            map.borrow_mut().insert("tmp".to_string(), Value::Null);
        }
        let removed = delete_prop
            .call(&[target.clone(), Value::string("tmp")])
            .unwrap();
        assert!(matches!(removed, Value::Bool(true)));
        let again = delete_prop.call(&[target, Value::string("tmp")]).unwrap();
        assert!(matches!(again, Value::Bool(false)));

        let err = delete_prop
            .call(&[Value::new_object(), Value::string("__proto__")])
            .unwrap_err();
        assert!(matches!(err, RuntimeError::ForbiddenKey { .. }));
    }

    #[test]
    fn test_limit_binding_raises() {
        let bindings = capability_bindings();
        let limit = native(&bindings[LIMIT_BINDING_NAME]);
        assert!(matches!(
            limit.call(&[]),
            Err(RuntimeError::IterationLimit)
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let bindings = capability_bindings();
        let json = match &bindings["JSON"] {
            Value::Object(map) => map.clone(),
            other => panic!("expected object, got {}", other.type_name()),
        };
        let stringify = native(&json.borrow()["stringify"]).clone();
        let parse = native(&json.borrow()["parse"]).clone();

        let object = Value::new_object();
        if let Value::Object(ref map) = object {
            map.borrow_mut().insert("a".to_string(), Value::Number(1.0));
        }
        let text = stringify.call(&[object]).unwrap();
        assert_eq!(text.display_string(), r#"{"a":1.0}"#);

        let back = parse.call(&[Value::string(r#"{"b": 2}"#)]).unwrap();
        match back {
            Value::Object(map) => {
                assert!(matches!(map.borrow()["b"], Value::Number(n) if n == 2.0));
            }
            other => panic!("expected object, got {}", other.type_name()),
        }
    }

    #[test]
    fn test_regexp_test() {
        let bindings = capability_bindings();
        let regexp = native(&bindings["RegExp"]);
        let re = regexp.call(&[Value::string("^a+b$")]).unwrap();
        let test = match &re {
            Value::Object(map) => native(&map.borrow()["test"]).clone(),
            other => panic!("expected object, got {}", other.type_name()),
        };
        assert!(matches!(
            test.call(&[Value::string("aaab")]),
            Ok(Value::Bool(true))
        ));
        assert!(matches!(
            test.call(&[Value::string("ba")]),
            Ok(Value::Bool(false))
        ));
    }
}
