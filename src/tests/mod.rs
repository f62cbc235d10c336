mod test_crypto;
mod test_executor;
mod test_queue;
mod test_session_db;
mod test_tasks;
