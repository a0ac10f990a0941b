//! # Repository Module
//!
//! Postgres implementations of the store capabilities.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  GoodsService                                                          │
//! │       │  store.reprioritize(&ctx, id, project_id, 1)                   │
//! │       ▼                                                                 │
//! │  GoodsRepository (impl GoodsStore)                                     │
//! │  ├── create / update / delete / reprioritize                           │
//! │  │       └── Database::within_transaction                              │
//! │  └── get / list                                                         │
//! │          └── Database::tx_from (ambient tx or pool)                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Postgres `goods` table                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod goods;
