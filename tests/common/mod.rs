//! 統合テスト共通の検証用ヘルパ
#![allow(dead_code)]

pub mod ccitt;
pub mod security;
