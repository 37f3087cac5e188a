// Copyright 2025 Cowboy AI, LLC.

//! Store wiring: reducer tree, bound action creators and prop mapping

mod bind;
mod combine;
mod connect;

pub use bind::{bind_action_creators, BoundActionCreator, BoundActionCreators};
pub use combine::{combine_reducers, CombinedReducer};
pub use connect::{
    connect_to_store, ConnectOptions, Connector, DispatcherTree, PropValue, Props, SelectorTree,
};
