mod host_session;
