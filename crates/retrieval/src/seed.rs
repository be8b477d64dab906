//! Seeds the handbook collections with a starter corpus of API-usage
//! memories, for local development and demos.

use promptgate_core::error::MutatorError;
use tracing::info;

use crate::embedding::EMBEDDING_DIM;
use crate::qdrant::{QdrantClient, UpsertPoint};
use crate::Embedder;

pub const POSITIVE_COLLECTION: &str = "skills-handbook-positive";
pub const NEGATIVE_COLLECTION: &str = "skills-handbook-negative";

/// One seed memory: what to do (or avoid), which tool it concerns, and why.
pub struct SeedMemory {
    pub id: u64,
    pub text: &'static str,
    pub tool: &'static str,
    pub reasoning: &'static str,
}

pub const POSITIVE_MEMORIES: &[SeedMemory] = &[
    SeedMemory {
        id: 1,
        text: "Always validate authentication tokens before processing requests",
        tool: "api",
        reasoning: "Security best practice to prevent unauthorized access",
    },
    SeedMemory {
        id: 2,
        text: "Include proper error handling with try-catch blocks around API calls",
        tool: "api",
        reasoning: "Prevents application crashes and provides better user feedback",
    },
    SeedMemory {
        id: 3,
        text: "Use pagination when fetching large datasets from the API",
        tool: "search",
        reasoning: "Improves performance and prevents memory issues",
    },
    SeedMemory {
        id: 4,
        text: "Always set timeout values for HTTP requests to prevent hanging",
        tool: "api",
        reasoning: "Prevents indefinite waiting and improves reliability",
    },
    SeedMemory {
        id: 5,
        text: "Validate input parameters before making API calls",
        tool: "api",
        reasoning: "Catches errors early and provides better error messages",
    },
    SeedMemory {
        id: 6,
        text: "Use environment variables to store API keys, never hardcode them",
        tool: "security",
        reasoning: "Security best practice to prevent credential leaks",
    },
    SeedMemory {
        id: 7,
        text: "Implement rate limiting to respect API quotas",
        tool: "api",
        reasoning: "Prevents hitting rate limits and service disruption",
    },
    SeedMemory {
        id: 8,
        text: "Log API requests and responses for debugging purposes",
        tool: "debugging",
        reasoning: "Helps troubleshoot issues and monitor system behavior",
    },
];

pub const NEGATIVE_MEMORIES: &[SeedMemory] = &[
    SeedMemory {
        id: 1,
        text: "Never skip authentication checks assuming requests are safe",
        tool: "api",
        reasoning: "Opens security vulnerabilities and allows unauthorized access",
    },
    SeedMemory {
        id: 2,
        text: "Don't ignore error responses from the API",
        tool: "api",
        reasoning: "Can lead to silent failures and data inconsistencies",
    },
    SeedMemory {
        id: 3,
        text: "Avoid fetching all records at once without pagination",
        tool: "search",
        reasoning: "Causes performance issues and can crash the application",
    },
    SeedMemory {
        id: 4,
        text: "Don't use infinite timeouts or no timeout at all",
        tool: "api",
        reasoning: "Can cause requests to hang indefinitely",
    },
    SeedMemory {
        id: 5,
        text: "Never expose API keys in client-side code or version control",
        tool: "security",
        reasoning: "Major security risk that can lead to unauthorized access",
    },
    SeedMemory {
        id: 6,
        text: "Don't make API calls in tight loops without rate limiting",
        tool: "api",
        reasoning: "Will hit rate limits and get blocked by the API",
    },
    SeedMemory {
        id: 7,
        text: "Avoid using HTTP instead of HTTPS for API calls",
        tool: "security",
        reasoning: "Data transmitted in plain text can be intercepted",
    },
    SeedMemory {
        id: 8,
        text: "Don't trust user input without sanitization in API requests",
        tool: "security",
        reasoning: "Opens the door to injection attacks and security vulnerabilities",
    },
];

/// Recreate both handbook collections and load the starter corpus.
/// Destructive: existing collections of the same names are replaced.
pub async fn seed_handbook(
    qdrant: &QdrantClient,
    embedder: &dyn Embedder,
) -> Result<(), MutatorError> {
    for (collection, memories) in
        [(POSITIVE_COLLECTION, POSITIVE_MEMORIES), (NEGATIVE_COLLECTION, NEGATIVE_MEMORIES)]
    {
        info!(collection, "Recreating collection");
        qdrant.recreate(collection, EMBEDDING_DIM).await?;

        let mut points = Vec::with_capacity(memories.len());
        for memory in memories {
            let vector = embedder.embed(memory.text).await?;
            points.push(UpsertPoint {
                id: memory.id,
                vector,
                payload: serde_json::json!({
                    "text": memory.text,
                    "tool": memory.tool,
                    "reasoning": memory.reasoning,
                }),
            });
        }
        qdrant.upsert(collection, &points).await?;
        info!(collection, count = points.len(), "Seeded collection");
    }
    Ok(())
}
