use anyhow::Context;

#[derive(Debug, Clone)]
pub struct HashConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// Files land in a directory on the local disk.
    Local { dir: String },
    /// Files land in an S3/MinIO bucket.
    S3 {
        endpoint: String,
        bucket: String,
        access_key: String,
        secret_key: String,
        region: String,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// `None` runs against the in-memory repository.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub storage: StorageConfig,
    pub hash: HashConfig,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let storage = match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".into())
            .as_str()
        {
            "local" => StorageConfig::Local {
                dir: std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "images".into()),
            },
            "s3" => StorageConfig::S3 {
                endpoint: std::env::var("MINIO_ENDPOINT").context("MINIO_ENDPOINT")?,
                bucket: std::env::var("MINIO_BUCKET").context("MINIO_BUCKET")?,
                access_key: std::env::var("MINIO_ACCESS_KEY").context("MINIO_ACCESS_KEY")?,
                secret_key: std::env::var("MINIO_SECRET_KEY").context("MINIO_SECRET_KEY")?,
                region: std::env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".into()),
            },
            other => anyhow::bail!("unknown STORAGE_BACKEND {other:?}, expected local or s3"),
        };

        let defaults = HashConfig::default();
        let hash = HashConfig {
            memory_kib: env_or("HASH_MEMORY_KIB", defaults.memory_kib),
            iterations: env_or("HASH_ITERATIONS", defaults.iterations),
            parallelism: env_or("HASH_PARALLELISM", defaults.parallelism),
        };

        Ok(Self {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("APP_PORT", 3000),
            database_url: std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            storage,
            hash,
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", 20 * 1024 * 1024),
        })
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_on_missing_or_garbage() {
        assert_eq!(env_or("CAMPUS_USERS_TEST_UNSET_VAR", 42u16), 42);
        std::env::set_var("CAMPUS_USERS_TEST_GARBAGE_VAR", "not-a-number");
        assert_eq!(env_or("CAMPUS_USERS_TEST_GARBAGE_VAR", 7u32), 7);
        std::env::set_var("CAMPUS_USERS_TEST_NUMBER_VAR", "15");
        assert_eq!(env_or("CAMPUS_USERS_TEST_NUMBER_VAR", 7u32), 15);
    }

    #[test]
    fn hash_defaults_follow_argon2() {
        let h = HashConfig::default();
        assert_eq!(h.memory_kib, 19 * 1024);
        assert_eq!(h.iterations, 2);
        assert_eq!(h.parallelism, 1);
    }
}
