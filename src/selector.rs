// Copyright 2025 Cowboy AI, LLC.

//! Selectors: plain functions over state, and memoized derived selectors

use crate::state::Value;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// `(namespaced_state, props, entire_state) -> value`
pub type SelectorFn = Arc<dyn Fn(&Value, &Value, &Value) -> Value + Send + Sync>;

/// Combiner of a derived selector, receiving every input's result in order
pub type CombinerFn = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// Read-only view over a model's state
#[derive(Clone)]
pub enum Selector {
    /// Evaluated on every call
    Plain(SelectorFn),
    /// Recomputed only when an input result changes
    Derived(DerivedSelector),
}

impl Selector {
    /// Plain selector
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value, &Value, &Value) -> Value + Send + Sync + 'static,
    {
        Selector::Plain(Arc::new(f))
    }

    /// Memoized selector: `combiner(inputs[0](..), .., inputs[n](..))`
    pub fn derived<C>(inputs: Vec<SelectorFn>, combiner: C) -> Self
    where
        C: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Selector::Derived(DerivedSelector {
            inputs,
            combiner: Arc::new(combiner),
            last: Arc::new(Mutex::new(None)),
        })
    }

    /// Evaluate
    pub fn select(&self, namespaced: &Value, props: &Value, entire: &Value) -> Value {
        match self {
            Selector::Plain(f) => f(namespaced, props, entire),
            Selector::Derived(derived) => derived.select(namespaced, props, entire),
        }
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Plain(_) => f.write_str("Selector::Plain"),
            Selector::Derived(d) => write!(f, "Selector::Derived({} inputs)", d.inputs.len()),
        }
    }
}

/// Memoized selector; clones share one cache
#[derive(Clone)]
pub struct DerivedSelector {
    inputs: Vec<SelectorFn>,
    combiner: CombinerFn,
    last: Arc<Mutex<Option<(Vec<Value>, Value)>>>,
}

impl DerivedSelector {
    fn select(&self, namespaced: &Value, props: &Value, entire: &Value) -> Value {
        let args: Vec<Value> = self
            .inputs
            .iter()
            .map(|input| input(namespaced, props, entire))
            .collect();

        let mut last = self.last.lock();
        if let Some((previous, result)) = last.as_ref() {
            if previous.len() == args.len()
                && previous.iter().zip(&args).all(|(a, b)| a.ptr_eq(b))
            {
                return result.clone();
            }
        }

        let result = (self.combiner)(&args);
        *last = Some((args, result.clone()));
        result
    }
}
