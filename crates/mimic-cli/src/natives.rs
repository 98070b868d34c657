//! Native functions available to manifests loaded by the CLI

use mimic_sdk::{NativeError, NativeFunction, NativeFunctionRegistry, TypeRef, Value};

pub fn builtin() -> NativeFunctionRegistry {
    let mut natives = NativeFunctionRegistry::new();

    natives.register(NativeFunction::from_fn2("std.concat", |a: String, b: String| a + &b));
    natives.register(NativeFunction::from_fn1("std.upper", |s: String| s.to_uppercase()));
    natives.register(NativeFunction::from_fn1("std.lower", |s: String| s.to_lowercase()));
    natives.register(NativeFunction::from_fn1("std.len", |s: String| s.chars().count() as i64));
    natives.register(NativeFunction::from_fn1("std.identity", |s: String| s));
    natives.register(NativeFunction::from_fn2("std.add.i32", |a: i32, b: i32| a.wrapping_add(b)));
    natives.register(NativeFunction::from_fn2("std.add.i64", |a: i64, b: i64| a.wrapping_add(b)));
    natives.register(NativeFunction::from_fn2("std.add.f64", |a: f64, b: f64| a + b));
    natives.register(NativeFunction::from_fn1("std.not", |b: bool| !b));

    natives.register(NativeFunction::new(
        "std.fail",
        vec![TypeRef::Str],
        TypeRef::Str,
        |_, args| {
            let reason = args.first().and_then(Value::as_str).unwrap_or("failed");
            Err(NativeError::Failed(reason.to_string()))
        },
    ));

    // Greets with the receiver's `greeting` field, falling back to "Hello"
    natives.register(NativeFunction::new(
        "std.greet",
        vec![TypeRef::Str],
        TypeRef::Str,
        |ctx, args| {
            let greeting = ctx
                .field("greeting")
                .and_then(Value::as_str)
                .filter(|g| !g.is_empty())
                .unwrap_or("Hello")
                .to_string();
            let name = args.first().and_then(Value::as_str).unwrap_or("world");
            Ok(Value::str(format!("{}, {}!", greeting, name)))
        },
    ));

    natives
}

#[cfg(test)]
mod tests {
    use super::*;
    use mimic_sdk::DetachedContext;

    #[test]
    fn test_builtin_functions() {
        let natives = builtin();
        let mut ctx = DetachedContext;

        let concat = natives.get("std.concat").unwrap();
        assert_eq!(
            concat.call(&mut ctx, &[Value::str("ab"), Value::str("cd")]).unwrap(),
            Value::str("abcd")
        );

        let greet = natives.get("std.greet").unwrap();
        assert_eq!(
            greet.call(&mut ctx, &[Value::str("Ada")]).unwrap(),
            Value::str("Hello, Ada!")
        );

        let fail = natives.get("std.fail").unwrap();
        assert_eq!(
            fail.call(&mut ctx, &[Value::str("nope")]),
            Err(NativeError::Failed("nope".to_string()))
        );
    }
}
