//! Recommending applications for new quests.
//!
//! The catalog is turned into tf-idf vectors over the words of application names and
//! identifiers ([tfidf]), grouped with k-means over cosine similarity ([kmeans]), and
//! applications sharing a group with the latest quest choice are suggested ([engine]).

pub mod engine;
pub mod entities;
pub mod kmeans;
pub mod sources;
pub mod tfidf;
