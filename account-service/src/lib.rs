//! Account Service
//!
//! Admin accounts of the church website: storage, credential checks and
//! token issuance. The HTTP layer calls it in-process through
//! [`AccountService`], which receives its repository at construction time.

pub mod models;
pub mod mysql;
pub mod password;
pub mod repository;
pub mod service;

pub use models::{
    Account, AccountChanges, AccountStatus, AccountView, CreateAccount, NewAccount,
    ProfileChanges, ProfileView,
};
pub use mysql::MySqlAccountRepository;
pub use repository::{AccountRepository, AdminGuarded, InMemoryAccountRepository};
pub use service::{AccountService, LoginOutcome, DEFAULT_EMAIL_DOMAIN};
